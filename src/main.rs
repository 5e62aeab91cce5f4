// src/main.rs
mod metrics;

use anyhow::{bail, ensure, Context, Result};
use clap::Parser as ClapParser;
use memmap2::Mmap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tracing::info;

use crate::metrics::Metrics;
use ticksim::{
    book::Side,
    config::Config,
    exec::ExecutionEngine,
    feed::MarketFeed,
    spsc::SpscQueue,
    strategy::{Signal, StatArbStrategy, Strategy, StrategyEngine},
    wire::{self, AddOrder, CancelOrder, ExecuteOrder, Message, ModifyOrder, Payload, Trade},
};

#[derive(ClapParser, Debug)]
#[command(name = "ticksim", version)]
struct Cli {
    /// key = value configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Replay a capture of wire records instead of generating data
    #[arg(long)]
    file: Option<PathBuf>,
    /// Stop after this many generated batches (0 = run until SIGINT/SIGTERM)
    #[arg(long, default_value_t = 0)]
    batches: u64,
    /// Messages per generated batch
    #[arg(long, default_value_t = 1_000)]
    batch_size: usize,
    /// Where to write the final book snapshot
    #[arg(long, default_value = "final_books.json")]
    out: PathBuf,
    /// Seed for generated data and simulated fills
    #[arg(long)]
    seed: Option<u64>,
    /// Pause between generated batches (ms)
    #[arg(long, default_value_t = 100)]
    throttle_ms: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let cli = Cli::parse();

    let mut config = Config::new();
    config.set("market_data.buffer_size", "1048576");
    config.set("symbols", "AAPL,MSFT,GOOG,AMZN,FB");
    config.set("strategy.stat_arb.z_score_threshold", "2.0");
    config.set("strategy.stat_arb.window_size", "100");
    if let Some(path) = &cli.config {
        config.merge_file(path)?;
        info!("loaded configuration from {:?}", path);
    }

    let symbols = config.get_list("symbols");
    ensure!(!symbols.is_empty(), "no symbols configured");
    info!("trading {} symbols: {}", symbols.len(), symbols.join(","));

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .context("install signal handler")?;
    }

    let metrics = Arc::new(Metrics::new());

    let feed = Arc::new(MarketFeed::new(
        config.get_usize("market_data.buffer_size", 1 << 20),
    ));
    for symbol in &symbols {
        let metrics = Arc::clone(&metrics);
        feed.subscribe(symbol, Box::new(move |_message, _symbol| metrics.inc_msgs()));
    }

    // strategy signals cross to the router thread through a bounded SPSC
    // queue; overflow drops the signal and counts it
    let signal_queue: Arc<SpscQueue<Signal>> = Arc::new(SpscQueue::with_capacity(1024));

    let mut strategies = StrategyEngine::new();
    let stat_arb = StatArbStrategy::new(
        symbols.clone(),
        config.get_f64("strategy.stat_arb.z_score_threshold", 2.0),
        config.get_usize("strategy.stat_arb.window_size", 100),
    );
    info!("registered strategy {}", stat_arb.name());
    strategies.register_strategy(Box::new(stat_arb));
    {
        let queue = Arc::clone(&signal_queue);
        let metrics = Arc::clone(&metrics);
        strategies.set_signal_callback(move |signal| {
            metrics.inc_signals();
            if queue.try_push(signal.clone()).is_err() {
                metrics.inc_signals_dropped();
            }
        });
    }

    let execution = Arc::new(ExecutionEngine::new(Arc::clone(&feed)));
    if let Some(seed) = cli.seed {
        execution.set_rng_seed(seed);
    }
    {
        let metrics = Arc::clone(&metrics);
        execution.set_execution_callback(move |report| {
            metrics.inc_reports();
            info!(
                "execution report: id={} status={:?} price={} exec_qty={} leaves_qty={} symbol={}",
                report.order_id,
                report.status,
                report.price,
                report.exec_quantity,
                report.leaves_quantity,
                report.symbol
            );
        });
    }

    strategies.start();
    execution.start();
    info!("engines started");

    let router = {
        let queue = Arc::clone(&signal_queue);
        let execution = Arc::clone(&execution);
        let running = Arc::clone(&running);
        std::thread::spawn(move || loop {
            match queue.try_pop() {
                Some(signal) => {
                    execution.submit_order(&signal);
                }
                None => {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    std::thread::sleep(Duration::from_micros(50));
                }
            }
        })
    };

    let result = match &cli.file {
        Some(path) => replay_file(path, &feed, &mut strategies, &symbols, &metrics, &running),
        None => run_generated(&cli, &feed, &mut strategies, &symbols, &metrics, &running),
    };

    running.store(false, Ordering::SeqCst);
    let _ = router.join();
    execution.stop();
    strategies.stop();

    write_snapshot(&cli.out, &feed)?;
    info!(
        "shutdown: {} (malformed records: {})",
        metrics.summary(),
        feed.malformed_count()
    );
    result
}

/// Random batches in the shape of a live feed: mostly adds, with modifies,
/// cancels, executes and trades mixed in against recent order ids.
fn generate_market_data(
    rng: &mut StdRng,
    symbols: &[String],
    count: usize,
    next_order_id: &mut u64,
) -> Vec<u8> {
    let timestamp_base = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let mut data = Vec::with_capacity(count * 64);
    for i in 0..count {
        let symbol = &symbols[rng.gen_range(0..symbols.len())];
        let last_id = (*next_order_id).saturating_sub(1).max(1);

        let payload = match rng.gen_range(1..=5u8) {
            1 => {
                let order_id = *next_order_id;
                *next_order_id += 1;
                Payload::AddOrder(AddOrder {
                    order_id,
                    price: rng.gen_range(9_000..=11_000),
                    quantity: rng.gen_range(1..=100),
                    side: rng.gen_range(0..=1),
                })
            }
            2 => Payload::ModifyOrder(ModifyOrder {
                order_id: last_id,
                quantity: rng.gen_range(1..=100),
            }),
            3 => Payload::CancelOrder(CancelOrder { order_id: last_id }),
            4 => Payload::ExecuteOrder(ExecuteOrder {
                order_id: last_id,
                exec_quantity: rng.gen_range(1..=100),
                exec_price: rng.gen_range(9_000..=11_000),
            }),
            _ => Payload::Trade(Trade {
                price: rng.gen_range(9_000..=11_000),
                quantity: rng.gen_range(1..=100),
                aggressor_side: rng.gen_range(0..=1),
            }),
        };

        wire::encode(
            &mut data,
            &Message {
                timestamp: timestamp_base + i as u64,
                payload,
            },
            symbol,
        );
    }
    data
}

fn drive_strategies(feed: &MarketFeed, strategies: &mut StrategyEngine, symbols: &[String]) {
    for symbol in symbols {
        if let Some(book) = feed.get_order_book(symbol) {
            let book = book.read().unwrap();
            strategies.process_order_book(&book);
        }
    }
}

fn log_books(feed: &MarketFeed, symbols: &[String]) {
    for symbol in symbols {
        if let Some(book) = feed.get_order_book(symbol) {
            let book = book.read().unwrap();
            let (bid_depth, ask_depth) = book.depth();
            info!(
                "{symbol} book: bid={:?} ({bid_depth}), ask={:?} ({ask_depth}), spread={:?}",
                book.best_bid(),
                book.best_ask(),
                book.spread()
            );
        }
    }
}

fn run_generated(
    cli: &Cli,
    feed: &MarketFeed,
    strategies: &mut StrategyEngine,
    symbols: &[String],
    metrics: &Metrics,
    running: &AtomicBool,
) -> Result<()> {
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut next_order_id: u64 = 1;
    let mut batch: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let data = generate_market_data(&mut rng, symbols, cli.batch_size, &mut next_order_id);

        let t0 = Instant::now();
        feed.process_buffer(&data);
        metrics.record_ingest(t0.elapsed());

        drive_strategies(feed, strategies, symbols);

        batch += 1;
        if batch % 10 == 0 {
            info!("batch {batch}: {}", metrics.summary());
            log_books(feed, symbols);
        }
        if cli.batches != 0 && batch >= cli.batches {
            break;
        }

        if cli.throttle_ms > 0 {
            std::thread::sleep(Duration::from_millis(cli.throttle_ms));
        }
    }

    info!("simulation complete after {batch} batches");
    Ok(())
}

fn replay_file(
    path: &Path,
    feed: &MarketFeed,
    strategies: &mut StrategyEngine,
    symbols: &[String],
    metrics: &Metrics,
    running: &AtomicBool,
) -> Result<()> {
    const CHUNK: usize = 64 * 1024;

    let file = File::open(path).with_context(|| format!("open capture {:?}", path))?;
    let mmap = unsafe { Mmap::map(&file)? };
    let bytes = mmap.as_ref();
    info!("replaying {:?} ({} bytes)", path, bytes.len());

    let mut pos = 0usize;
    while pos < bytes.len() && running.load(Ordering::SeqCst) {
        let end = (pos + CHUNK).min(bytes.len());
        let mut chunk = &bytes[pos..end];

        loop {
            let accepted = feed.push_bytes(chunk);
            chunk = &chunk[accepted..];

            let t0 = Instant::now();
            let processed = feed.process_pending();
            metrics.record_ingest(t0.elapsed());

            if chunk.is_empty() {
                break;
            }
            if accepted == 0 && processed == 0 {
                bail!("replay stalled: record larger than the staging buffer");
            }
        }

        pos = end;
        drive_strategies(feed, strategies, symbols);
    }

    info!("replay complete ({pos} of {} bytes)", bytes.len());
    Ok(())
}

fn write_snapshot(path: &Path, feed: &MarketFeed) -> Result<()> {
    let mut names = feed.symbols();
    names.sort();

    let mut symbols_map = serde_json::Map::new();
    for symbol in names {
        let Some(book) = feed.get_order_book(&symbol) else {
            continue;
        };
        let book = book.read().unwrap();
        let (bid_depth, ask_depth) = book.depth();
        symbols_map.insert(
            symbol.clone(),
            json!({
                "best_bid": book.best_bid(),
                "best_ask": book.best_ask(),
                "bid_depth": bid_depth,
                "ask_depth": ask_depth,
                "bids": book.get_levels(Side::Buy, 10),
                "asks": book.get_levels(Side::Sell, 10),
                "last_update": book.last_update(),
            }),
        );
    }

    let text = json!({ "type": "final", "symbols": symbols_map }).to_string();
    std::fs::write(path, text).with_context(|| format!("write snapshot {:?}", path))?;
    info!("wrote final snapshot to {:?}", path);
    Ok(())
}
