use chrono::Utc;
use kestrel_backtest::load_snapshots;
use kestrel_backtest::synthetic::gbm_series;
use kestrel_clock::{Clock, SystemClock};
use kestrel_gateway::SimulatedConnector;
use kestrel_ports::ExchangeConnector;
use kestrel_runner::{
    EngineConfig, StrategyManager, SymbolConfig, SymbolSession, init_logging, stoikov_backtest,
};
use log::{info, warn};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Interval between synthetic snapshots in the demo
const DEMO_TICK: Duration = Duration::from_millis(50);

fn print_help() {
    eprintln!(
        r#"Kestrel - market-making engine

USAGE:
    kestrel backtest [OPTIONS]
    kestrel demo [OPTIONS]

BACKTEST OPTIONS:
    --config <PATH>       Load configuration from JSON file
    --data <PATH>         JSONL file of book snapshots (overrides data_path)
    --synthetic <BARS>    Replay a seeded random walk instead of a data file
    --out <DIR>           Results directory (overrides output_path)

DEMO OPTIONS:
    --config <PATH>       Load configuration from JSON file
    --symbols <N>         Number of symbols to run (default: configured symbols)
    --ticks <N>           Snapshots per symbol (default: 200)

OPTIONS:
    --help                Print this help message

ENVIRONMENT VARIABLES:
    KESTREL_NUM_THREADS   Worker threads
    KESTREL_LOG_LEVEL     Default log level
    KESTREL_DATA_PATH     Snapshot file for backtests
    KESTREL_OUTPUT_PATH   Results directory
    RUST_LOG              Log filter, takes precedence over the config

EXAMPLES:
    kestrel backtest --config kestrel.json --data data/xbtusd.jsonl --out results
    kestrel backtest --synthetic 5000
    kestrel demo --symbols 3
"#
    );
}

#[derive(Debug, Default)]
struct Args {
    command: String,
    config_path: Option<String>,
    data_path: Option<String>,
    output_path: Option<String>,
    synthetic_bars: Option<usize>,
    symbols: Option<usize>,
    ticks: usize,
}

fn parse_args() -> Result<Option<Args>, Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        ticks: 200,
        ..Default::default()
    };

    let value = |i: usize, flag: &str| -> Result<String, Box<dyn Error>> {
        args.get(i)
            .cloned()
            .ok_or_else(|| format!("{} requires a value", flag).into())
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => return Ok(None),
            "backtest" | "demo" if parsed.command.is_empty() => {
                parsed.command = args[i].clone();
            }
            "--config" | "-c" => {
                i += 1;
                parsed.config_path = Some(value(i, "--config")?);
            }
            "--data" => {
                i += 1;
                parsed.data_path = Some(value(i, "--data")?);
            }
            "--out" => {
                i += 1;
                parsed.output_path = Some(value(i, "--out")?);
            }
            "--synthetic" => {
                i += 1;
                parsed.synthetic_bars = Some(value(i, "--synthetic")?.parse()?);
            }
            "--symbols" => {
                i += 1;
                parsed.symbols = Some(value(i, "--symbols")?.parse()?);
            }
            "--ticks" => {
                i += 1;
                parsed.ticks = value(i, "--ticks")?.parse()?;
            }
            arg => return Err(format!("Unknown argument: {}", arg).into()),
        }
        i += 1;
    }

    if parsed.command.is_empty() {
        return Ok(None);
    }
    Ok(Some(parsed))
}

fn load_config(args: &Args) -> Result<EngineConfig, Box<dyn Error>> {
    let mut config = match &args.config_path {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env()?;
    if let Some(path) = &args.data_path {
        config.data_path = path.clone();
    }
    if let Some(path) = &args.output_path {
        config.output_path = path.clone();
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_help();
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    let config = load_config(&args)?;
    init_logging(&config.log_level);
    if let Some(path) = &args.config_path {
        info!("Loaded configuration from: {}", path);
    }

    match args.command.as_str() {
        "backtest" => run_backtest(&config, &args),
        _ => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(config.num_threads)
                .enable_all()
                .build()?;
            runtime.block_on(run_demo(&config, &args))
        }
    }
}

fn run_backtest(config: &EngineConfig, args: &Args) -> Result<(), Box<dyn Error>> {
    let snapshots = match args.synthetic_bars {
        Some(bars) => {
            let symbol = config.symbols[0].symbol();
            info!("Replaying {} synthetic snapshots of {}", bars, symbol);
            gbm_series(symbol, 100.0, 0.0, 0.002, bars, 7)
        }
        None => {
            info!("Loading snapshots from: {}", config.data_path);
            load_snapshots(&config.data_path)?
        }
    };

    // Settings of the recorded symbol, else the first configured one
    let symbol = snapshots
        .first()
        .and_then(|d| config.symbol(&d.symbol))
        .unwrap_or(&config.symbols[0]);
    let start = snapshots
        .first()
        .map(|d| d.last_update)
        .unwrap_or_else(Utc::now);

    let mut engine = stoikov_backtest(symbol, config.backtest.clone(), start);
    let results = engine.run(&snapshots)?;

    let out = PathBuf::from(&config.output_path);
    std::fs::create_dir_all(&out)?;
    results.save_json(out.join("results.json"))?;
    results.save_csv(&out)?;

    let m = &results.metrics;
    let s = &results.summary;
    info!("Results written to: {}", out.display());
    println!("symbol            {}", symbol.symbol());
    println!("bars              {}", s.bars);
    println!("trades            {}", s.trade_count);
    println!("final equity      {:.2}", s.final_equity);
    println!("total return      {:.4}%", m.total_return * 100.0);
    println!("sharpe            {:.3}", m.sharpe_ratio);
    println!("max drawdown      {:.4}%", m.max_drawdown * 100.0);
    println!("win rate          {:.2}%", m.win_rate * 100.0);
    if let Some(at) = s.halted_at {
        println!("halted at         {}", at);
    }
    Ok(())
}

async fn run_demo(config: &EngineConfig, args: &Args) -> Result<(), Box<dyn Error>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let manager = Arc::new(StrategyManager::new(config.health.clone(), clock.clone()));

    let count = args.symbols.unwrap_or(config.symbols.len()).max(1);
    let symbols: Vec<SymbolConfig> = (0..count)
        .map(|i| match config.symbols.get(i) {
            Some(symbol) => symbol.clone(),
            None => {
                let mut extra = config.symbols[0].clone();
                extra.order_manager.symbol = format!("SIM{}", i);
                extra
            }
        })
        .collect();

    let mut feeds = Vec::new();
    for (i, symbol_config) in symbols.iter().enumerate() {
        let symbol = symbol_config.symbol().to_string();
        let sim = Arc::new(
            SimulatedConnector::new()
                .with_name(format!("sim-{}", symbol))
                .with_auto_fill(),
        );
        let mut market_data = sim.subscribe_market_data();
        let mut executions = sim.subscribe_executions();
        manager.add_symbol(SymbolSession::stoikov(
            symbol_config,
            sim.clone(),
            clock.clone(),
        ))?;

        let m = manager.clone();
        tokio::spawn(async move {
            while let Some(depth) = market_data.recv().await {
                if let Err(e) = m.dispatch_market_data(depth).await {
                    warn!("Market data dispatch failed: {}", e);
                    break;
                }
            }
        });
        let m = manager.clone();
        let exec_symbol = symbol.clone();
        tokio::spawn(async move {
            while let Some(report) = executions.recv().await {
                if let Err(e) = m.dispatch_execution(&exec_symbol, report).await {
                    warn!("Execution dispatch failed: {}", e);
                    break;
                }
            }
        });

        let series = gbm_series(&symbol, 100.0, 0.0, 0.002, args.ticks, 42 + i as u64);
        feeds.push(tokio::spawn(async move {
            for depth in series {
                if sim.publish_market_data(depth).await.is_err() {
                    break;
                }
                tokio::time::sleep(DEMO_TICK).await;
            }
        }));
    }

    info!("Demo running {} symbol(s), {} ticks each", symbols.len(), args.ticks);
    for feed in feeds {
        feed.await?;
    }
    // Let the queues drain before stopping
    tokio::time::sleep(DEMO_TICK * 4).await;

    for summary in manager.shutdown().await {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
