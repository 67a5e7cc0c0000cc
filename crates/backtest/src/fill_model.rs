//! Fill simulation
//!
//! A [`FillModel`] decides how much of a routed, resting order trades
//! against a snapshot. The engine caps the answer at the order's remaining
//! quantity.

use kestrel_core::{MarketDepth, Order, Side};

pub trait FillModel: Send {
    /// Quantity of `order` filled by `depth`; zero for no fill
    fn fill_quantity(&mut self, order: &Order, depth: &MarketDepth) -> f64;
}

/// Fill when the opposite touch reaches the order's limit price, up to the
/// size quoted at the touch.
#[derive(Debug, Clone, Copy, Default)]
pub struct TouchFill;

impl FillModel for TouchFill {
    fn fill_quantity(&mut self, order: &Order, depth: &MarketDepth) -> f64 {
        let touch = match order.side {
            Side::Buy => depth.asks[0],
            Side::Sell => depth.bids[0],
        };
        if !touch.is_quoted() {
            return 0.0;
        }
        let crosses = match order.side {
            Side::Buy => touch.price <= order.price,
            Side::Sell => touch.price >= order.price,
        };
        if crosses {
            order.remaining_quantity().min(touch.quantity)
        } else {
            0.0
        }
    }
}

/// Every routed order fills in full on the bar it is routed
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateFill;

impl FillModel for ImmediateFill {
    fn fill_quantity(&mut self, order: &Order, _depth: &MarketDepth) -> f64 {
        order.remaining_quantity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn book() -> MarketDepth {
        MarketDepth::from_levels("XBTUSD", &[(99.0, 2.0)], &[(101.0, 3.0)], Utc::now())
    }

    fn order(side: Side, price: f64, qty: f64) -> Order {
        Order::new_with_time(1, "XBTUSD", side, price, qty, Utc::now())
    }

    #[test]
    fn test_touch_fill_requires_cross() {
        let mut model = TouchFill;
        assert_eq!(model.fill_quantity(&order(Side::Buy, 100.0, 1.0), &book()), 0.0);
        assert_eq!(model.fill_quantity(&order(Side::Sell, 100.0, 1.0), &book()), 0.0);
        assert_eq!(model.fill_quantity(&order(Side::Buy, 101.0, 1.0), &book()), 1.0);
        assert_eq!(model.fill_quantity(&order(Side::Sell, 98.0, 1.0), &book()), 1.0);
    }

    #[test]
    fn test_touch_fill_capped_by_liquidity() {
        let mut model = TouchFill;
        assert_eq!(model.fill_quantity(&order(Side::Buy, 102.0, 5.0), &book()), 3.0);

        let partially_filled = order(Side::Sell, 99.0, 5.0).with_fill(4.0, Utc::now());
        assert_eq!(model.fill_quantity(&partially_filled, &book()), 1.0);
    }

    #[test]
    fn test_touch_fill_empty_side() {
        let mut model = TouchFill;
        let one_sided = MarketDepth::from_levels("XBTUSD", &[(99.0, 2.0)], &[], Utc::now());
        assert_eq!(model.fill_quantity(&order(Side::Buy, 200.0, 1.0), &one_sided), 0.0);
    }

    #[test]
    fn test_immediate_fill() {
        let mut model = ImmediateFill;
        assert_eq!(model.fill_quantity(&order(Side::Buy, 1.0, 2.5), &book()), 2.5);
    }
}
