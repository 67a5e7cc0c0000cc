//! Order table and derived position/notional accounting

use crate::config::OrderManagerConfig;
use crate::error::{PlacementRejection, Result, UpdateError};
use kestrel_core::{AtomicF64, Fill, Order, OrderId, OrderStatus, Side};
use kestrel_ports::Clock;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Orders keyed by id. Terminal orders leave `active` and only their final
/// status is retained, so late execution reports can still be classified.
#[derive(Default)]
struct OrderTable {
    active: BTreeMap<OrderId, Order>,
    closed: HashMap<OrderId, OrderStatus>,
}

impl OrderTable {
    fn close(&mut self, order: Order) {
        self.closed.insert(order.id, order.status);
    }
}

/// Sole owner of order identity, lifecycle and the position derived from fills.
///
/// Position and notional are lock-free scalars. Fill updates write notional
/// before position, both with release ordering, and readers load position
/// first with acquire ordering: a reader that sees a new position also sees
/// its notional.
pub struct OrderManager {
    config: OrderManagerConfig,
    clock: Arc<dyn Clock>,
    next_id: AtomicU64,
    orders: RwLock<OrderTable>,
    position: AtomicF64,
    notional: AtomicF64,
    violations: AtomicU64,
}

impl OrderManager {
    pub fn new(config: OrderManagerConfig, clock: Arc<dyn Clock>) -> Self {
        info!(
            "[OM] {} order manager up: max_position={}, max_order_size={}, max_notional={}, max_active_orders={}",
            config.symbol,
            config.max_position,
            config.max_order_size,
            config.max_notional,
            config.max_active_orders
        );
        Self {
            config,
            clock,
            next_id: AtomicU64::new(1),
            orders: RwLock::new(OrderTable::default()),
            position: AtomicF64::new(0.0),
            notional: AtomicF64::new(0.0),
            violations: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &OrderManagerConfig {
        &self.config
    }

    /// Register a new order if it passes the local limits.
    ///
    /// Returns `None` when any check fails; this is a normal outcome.
    pub fn place_order(&self, side: Side, price: f64, quantity: f64) -> Option<Order> {
        match self.try_place_order(side, price, quantity) {
            Ok(order) => Some(order),
            Err(reason) => {
                debug!("[OM] {:?} {}@{} rejected: {}", side, quantity, price, reason);
                None
            }
        }
    }

    /// Like [`place_order`](Self::place_order) but reports the failed check
    pub fn try_place_order(
        &self,
        side: Side,
        price: f64,
        quantity: f64,
    ) -> std::result::Result<Order, PlacementRejection> {
        // Every candidate consumes an id, accepted or not
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let order = Order::new_with_time(
            id,
            self.config.symbol.clone(),
            side,
            price,
            quantity,
            self.clock.now(),
        );

        if let Some(reason) = self.limit_breach(side, price, quantity) {
            return Err(reason);
        }

        let mut table = self.orders.write();
        if table.active.len() >= self.config.max_active_orders {
            return Err(PlacementRejection::ActiveOrders {
                active: table.active.len(),
                limit: self.config.max_active_orders,
            });
        }
        table.active.insert(id, order.clone());
        debug!("[OM] Placed order {}: {:?} {}@{}", id, side, quantity, price);
        Ok(order)
    }

    /// Local limit checks; `true` when the order may be placed
    pub fn check_risk_limits(&self, side: Side, price: f64, quantity: f64) -> bool {
        self.limit_breach(side, price, quantity).is_none()
    }

    fn limit_breach(&self, side: Side, price: f64, quantity: f64) -> Option<PlacementRejection> {
        if !(price.is_finite() && price > 0.0 && quantity.is_finite() && quantity > 0.0) {
            return Some(PlacementRejection::InvalidOrder { price, quantity });
        }
        if quantity > self.config.max_order_size {
            return Some(PlacementRejection::OrderSize {
                quantity,
                limit: self.config.max_order_size,
            });
        }
        let resulting = self.position() + side.signed(quantity);
        if resulting.abs() > self.config.max_position {
            return Some(PlacementRejection::Position {
                resulting,
                limit: self.config.max_position,
            });
        }
        let resulting = self.notional_exposure() + price * quantity;
        if resulting > self.config.max_notional {
            return Some(PlacementRejection::Notional {
                resulting,
                limit: self.config.max_notional,
            });
        }
        None
    }

    /// Cancel an active order. Terminal or unknown orders report `false`.
    pub fn cancel_order(&self, id: OrderId) -> bool {
        self.close_active(id, OrderStatus::Cancelled)
    }

    /// Mark an active order Rejected after a downstream check refused it
    pub fn reject_order(&self, id: OrderId) -> bool {
        self.close_active(id, OrderStatus::Rejected)
    }

    /// Cancel every active order, returning the ids that were cancelled
    pub fn cancel_all(&self) -> Vec<OrderId> {
        let now = self.clock.now();
        let mut table = self.orders.write();
        let drained = std::mem::take(&mut table.active);
        let ids: Vec<OrderId> = drained.keys().copied().collect();
        for (_, order) in drained {
            table.close(order.with_status(OrderStatus::Cancelled, now));
        }
        if !ids.is_empty() {
            debug!("[OM] Cancelled {} active orders", ids.len());
        }
        ids
    }

    fn close_active(&self, id: OrderId, status: OrderStatus) -> bool {
        let now = self.clock.now();
        let mut table = self.orders.write();
        if let Some(order) = table.active.remove(&id) {
            table.close(order.with_status(status, now));
            debug!("[OM] Order {} -> {:?}", id, status);
            return true;
        }
        if let Some(status) = table.closed.get(&id) {
            debug!("[OM] Order {} already {:?}", id, status);
        } else {
            self.violations.fetch_add(1, Ordering::Relaxed);
            warn!("[OM] Protocol violation: {:?} requested for unknown order {}", status, id);
        }
        false
    }

    /// Apply an execution update.
    ///
    /// Returns the incremental fill when the cumulative filled quantity grew.
    /// Violations leave the order, position and notional untouched.
    pub fn update_order(&self, snapshot: &Order) -> Result<Option<Fill>> {
        let mut table = self.orders.write();
        let fill = Self::apply_update(&mut table, snapshot).inspect_err(|err| {
            self.violations.fetch_add(1, Ordering::Relaxed);
            warn!("[OM] Protocol violation: {}", err);
        })?;

        if let Some(fill) = &fill {
            // Still under the writer lock: fills for one order apply in arrival order
            self.notional
                .fetch_add(fill.price * fill.quantity, Ordering::AcqRel);
            self.position
                .fetch_add(fill.signed_quantity(), Ordering::AcqRel);
            drop(table);
            debug!(
                "[OM] Fill on {}: {:?} {}@{}, position={}",
                fill.order_id,
                fill.side,
                fill.quantity,
                fill.price,
                self.position()
            );
        }
        Ok(fill)
    }

    fn apply_update(table: &mut OrderTable, snapshot: &Order) -> Result<Option<Fill>> {
        let id = snapshot.id;
        let Some(current) = table.active.get(&id) else {
            return Err(match table.closed.get(&id) {
                Some(status) => UpdateError::TerminalOrder {
                    id,
                    status: *status,
                },
                None => UpdateError::UnknownOrder(id),
            });
        };

        let delta = snapshot.filled_quantity - current.filled_quantity;
        if delta < 0.0 {
            return Err(UpdateError::NegativeFill {
                id,
                previous: current.filled_quantity,
                reported: snapshot.filled_quantity,
            });
        }
        if snapshot.filled_quantity > current.quantity {
            return Err(UpdateError::Overfill {
                id,
                filled: snapshot.filled_quantity,
                quantity: current.quantity,
            });
        }

        let status = if snapshot.filled_quantity >= current.quantity {
            OrderStatus::Filled
        } else if delta > 0.0 && snapshot.status == OrderStatus::New {
            OrderStatus::PartiallyFilled
        } else {
            snapshot.status
        };
        if !current.status.can_transition_to(status) {
            return Err(UpdateError::StatusRegression {
                id,
                from: current.status,
                to: status,
            });
        }

        // Identity fields stay as registered; the venue reports fills and state
        let mut next = current.clone();
        next.filled_quantity = snapshot.filled_quantity;
        next.status = status;
        next.updated_at = snapshot.updated_at;

        let fill = (delta > 0.0).then(|| Fill {
            order_id: id,
            side: current.side,
            price: snapshot.price,
            quantity: delta,
            timestamp: snapshot.updated_at,
        });

        if next.status.is_terminal() {
            table.active.remove(&id);
            table.close(next);
        } else {
            table.active.insert(id, next);
        }
        Ok(fill)
    }

    pub fn get_order(&self, id: OrderId) -> Option<Order> {
        self.orders.read().active.get(&id).cloned()
    }

    /// Final status of an order that has left the active set
    pub fn closed_status(&self, id: OrderId) -> Option<OrderStatus> {
        self.orders.read().closed.get(&id).copied()
    }

    /// Copies of all active orders, in id order
    pub fn get_active_orders(&self) -> Vec<Order> {
        self.orders.read().active.values().cloned().collect()
    }

    pub fn active_order_count(&self) -> usize {
        self.orders.read().active.len()
    }

    /// Signed position, positive when net long
    pub fn position(&self) -> f64 {
        self.position.load(Ordering::Acquire)
    }

    /// Sum of `price * fill_delta` over all fills
    pub fn notional_exposure(&self) -> f64 {
        self.notional.load(Ordering::Acquire)
    }

    /// Number of protocol violations reported so far
    pub fn protocol_violations(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kestrel_clock::SystemClock;

    fn manager() -> OrderManager {
        OrderManager::new(OrderManagerConfig::default(), Arc::new(SystemClock::new()))
    }

    #[test]
    fn test_ids_are_monotonic_and_start_at_one() {
        let om = manager();
        let a = om.place_order(Side::Buy, 100.0, 1.0).unwrap();
        let b = om.place_order(Side::Sell, 101.0, 1.0).unwrap();
        assert_eq!(a.id, 1);
        assert!(b.id > a.id);
        assert_eq!(a.status, OrderStatus::New);
    }

    #[test]
    fn test_rejected_candidate_still_consumes_id() {
        let om = manager();
        assert!(om.place_order(Side::Buy, 100.0, 50.0).is_none());
        let next = om.place_order(Side::Buy, 100.0, 1.0).unwrap();
        assert_eq!(next.id, 2);
    }

    #[test]
    fn test_order_size_limit() {
        let om = manager();
        let err = om.try_place_order(Side::Buy, 100.0, 10.5).unwrap_err();
        assert!(matches!(err, PlacementRejection::OrderSize { .. }));
        assert_eq!(om.active_order_count(), 0);
        assert_eq!(om.position(), 0.0);
    }

    #[test]
    fn test_invalid_price_rejected() {
        let om = manager();
        assert!(om.place_order(Side::Buy, 0.0, 1.0).is_none());
        assert!(om.place_order(Side::Buy, f64::NAN, 1.0).is_none());
        assert!(om.place_order(Side::Sell, 100.0, -1.0).is_none());
    }

    #[test]
    fn test_active_order_cap() {
        let config = OrderManagerConfig {
            max_active_orders: 2,
            ..Default::default()
        };
        let om = OrderManager::new(config, Arc::new(SystemClock::new()));
        assert!(om.place_order(Side::Buy, 99.0, 1.0).is_some());
        assert!(om.place_order(Side::Sell, 101.0, 1.0).is_some());
        let err = om.try_place_order(Side::Buy, 98.0, 1.0).unwrap_err();
        assert_eq!(err, PlacementRejection::ActiveOrders { active: 2, limit: 2 });
    }

    #[test]
    fn test_position_limit_uses_fills() {
        let config = OrderManagerConfig {
            max_position: 5.0,
            ..Default::default()
        };
        let om = OrderManager::new(config, Arc::new(SystemClock::new()));
        let order = om.place_order(Side::Buy, 100.0, 4.0).unwrap();
        om.update_order(&order.with_fill(4.0, Utc::now())).unwrap();

        assert!(!om.check_risk_limits(Side::Buy, 100.0, 2.0));
        assert!(om.check_risk_limits(Side::Sell, 100.0, 9.0));
    }

    #[test]
    fn test_notional_limit() {
        let om = manager();
        // 10 * 1001 > 10_000
        assert!(!om.check_risk_limits(Side::Buy, 1001.0, 10.0));
        assert!(om.check_risk_limits(Side::Buy, 1000.0, 10.0));
    }

    #[test]
    fn test_partial_then_full_fill() {
        let om = manager();
        let order = om.place_order(Side::Buy, 100.0, 4.0).unwrap();

        let fill = om
            .update_order(&order.with_fill(1.0, Utc::now()))
            .unwrap()
            .unwrap();
        assert_eq!(fill.quantity, 1.0);
        assert_eq!(
            om.get_order(order.id).unwrap().status,
            OrderStatus::PartiallyFilled
        );

        let fill = om
            .update_order(&order.with_fill(4.0, Utc::now()))
            .unwrap()
            .unwrap();
        assert_eq!(fill.quantity, 3.0);
        assert!(om.get_order(order.id).is_none());
        assert_eq!(om.closed_status(order.id), Some(OrderStatus::Filled));
        assert_eq!(om.position(), 4.0);
        assert_eq!(om.notional_exposure(), 400.0);
    }

    #[test]
    fn test_negative_fill_delta_rejected() {
        let om = manager();
        let order = om.place_order(Side::Sell, 100.0, 4.0).unwrap();
        om.update_order(&order.with_fill(3.0, Utc::now())).unwrap();

        let err = om
            .update_order(&order.with_fill(2.0, Utc::now()))
            .unwrap_err();
        assert!(matches!(err, UpdateError::NegativeFill { .. }));
        assert_eq!(om.position(), -3.0);
        assert_eq!(om.protocol_violations(), 1);
    }

    #[test]
    fn test_overfill_rejected() {
        let om = manager();
        let order = om.place_order(Side::Buy, 100.0, 2.0).unwrap();
        let mut snapshot = order.with_fill(2.0, Utc::now());
        snapshot.filled_quantity = 2.5;
        let err = om.update_order(&snapshot).unwrap_err();
        assert!(matches!(err, UpdateError::Overfill { .. }));
        assert_eq!(om.position(), 0.0);
        assert_eq!(om.get_order(order.id).unwrap().filled_quantity, 0.0);
    }

    #[test]
    fn test_duplicate_fill_is_noop() {
        let om = manager();
        let order = om.place_order(Side::Buy, 100.0, 4.0).unwrap();
        let snapshot = order.with_fill(1.0, Utc::now());
        assert!(om.update_order(&snapshot).unwrap().is_some());
        assert!(om.update_order(&snapshot).unwrap().is_none());
        assert_eq!(om.position(), 1.0);
    }

    #[test]
    fn test_fill_after_cancel_rejected() {
        let om = manager();
        let order = om.place_order(Side::Buy, 100.0, 1.0).unwrap();
        assert!(om.cancel_order(order.id));
        assert!(!om.cancel_order(order.id));

        let err = om
            .update_order(&order.with_fill(1.0, Utc::now()))
            .unwrap_err();
        assert_eq!(
            err,
            UpdateError::TerminalOrder {
                id: order.id,
                status: OrderStatus::Cancelled
            }
        );
        assert_eq!(om.position(), 0.0);
    }

    #[test]
    fn test_cancel_unknown_counts_violation() {
        let om = manager();
        assert!(!om.cancel_order(42));
        assert_eq!(om.protocol_violations(), 1);
        assert!(matches!(
            om.update_order(&Order::new_with_time(42, "XBTUSD", Side::Buy, 1.0, 1.0, Utc::now())),
            Err(UpdateError::UnknownOrder(42))
        ));
    }

    #[test]
    fn test_status_regression_rejected() {
        let om = manager();
        let order = om.place_order(Side::Buy, 100.0, 4.0).unwrap();
        om.update_order(&order.with_fill(1.0, Utc::now())).unwrap();

        let mut stale = order.with_fill(1.0, Utc::now());
        stale.status = OrderStatus::New;
        let err = om.update_order(&stale).unwrap_err();
        assert!(matches!(err, UpdateError::StatusRegression { .. }));
    }

    #[test]
    fn test_cancel_all() {
        let om = manager();
        om.place_order(Side::Buy, 99.0, 1.0).unwrap();
        om.place_order(Side::Sell, 101.0, 1.0).unwrap();
        assert_eq!(om.cancel_all(), vec![1, 2]);
        assert_eq!(om.active_order_count(), 0);
        assert_eq!(om.closed_status(2), Some(OrderStatus::Cancelled));
    }
}
