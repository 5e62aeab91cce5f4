// tests/execution.rs
//! Execution engine behavior: fills against live books, rejects, partials,
//! cancels, and the report sequence contract.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ticksim::exec::{ExecutionEngine, ExecutionReport, OrderStatus};
use ticksim::feed::MarketFeed;
use ticksim::strategy::{Signal, SignalKind};
use ticksim::wire::{self, AddOrder, Message, Payload};

type Reports = Arc<Mutex<Vec<ExecutionReport>>>;

fn feed_with_resting_sell(symbol: &str, price: i64, quantity: u32) -> Arc<MarketFeed> {
    let feed = Arc::new(MarketFeed::new(4096));
    feed.subscribe(symbol, Box::new(|_, _| {}));

    let mut batch = Vec::new();
    wire::encode(
        &mut batch,
        &Message {
            timestamp: 1,
            payload: Payload::AddOrder(AddOrder {
                order_id: 1,
                price,
                quantity,
                side: 1,
            }),
        },
        symbol,
    );
    assert_eq!(feed.process_buffer(&batch), batch.len());
    feed
}

fn collecting_engine(feed: Arc<MarketFeed>) -> (ExecutionEngine, Reports) {
    let engine = ExecutionEngine::new(feed);
    engine.set_fill_delay(Duration::from_micros(10));

    let reports: Reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    engine.set_execution_callback(move |report| sink.lock().unwrap().push(report.clone()));

    (engine, reports)
}

fn signal(kind: SignalKind, symbol: &str, price: i64, quantity: u32) -> Signal {
    Signal {
        kind,
        symbol: symbol.to_owned(),
        price,
        quantity,
        confidence: 1.0,
        timestamp: 42,
    }
}

fn wait_until(reports: &Reports, pred: impl Fn(&[ExecutionReport]) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if pred(&reports.lock().unwrap()) {
            return;
        }
        assert!(Instant::now() < deadline, "timed out waiting for reports");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn crossing_buy_fills_at_the_touch() {
    let feed = feed_with_resting_sell("AAPL", 10_000, 10);
    let (engine, reports) = collecting_engine(feed);
    engine.start();

    let order_id = engine.submit_order(&signal(SignalKind::Buy, "AAPL", 10_050, 5));

    wait_until(&reports, |r| r.len() >= 2);
    engine.stop();

    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 2);

    assert_eq!(reports[0].order_id, order_id);
    assert_eq!(reports[0].status, OrderStatus::New);
    assert_eq!(reports[0].price, 10_050);
    assert_eq!(reports[0].exec_quantity, 0);
    assert_eq!(reports[0].leaves_quantity, 5);
    assert_eq!(reports[0].timestamp, 42);

    assert_eq!(reports[1].status, OrderStatus::Filled);
    assert_eq!(reports[1].price, 10_000); // fill at the touched side
    assert_eq!(reports[1].exec_quantity, 5);
    assert_eq!(reports[1].leaves_quantity, 0);
    assert_eq!(reports[1].symbol, "AAPL");

    // completed orders are unknown to status queries
    assert_eq!(engine.get_order_status(order_id), OrderStatus::Rejected);
}

#[test]
fn unknown_symbol_is_rejected() {
    let feed = Arc::new(MarketFeed::new(4096));
    let (engine, reports) = collecting_engine(feed);
    engine.start();

    let order_id = engine.submit_order(&signal(SignalKind::Buy, "ZZZ", 10_000, 7));

    wait_until(&reports, |r| r.len() >= 2);
    engine.stop();

    let reports = reports.lock().unwrap();
    assert_eq!(reports[0].status, OrderStatus::New);
    assert_eq!(reports[1].order_id, order_id);
    assert_eq!(reports[1].status, OrderStatus::Rejected);
    assert_eq!(reports[1].exec_quantity, 0);
    assert_eq!(reports[1].leaves_quantity, 7);
}

#[test]
fn non_crossing_order_partials_until_done() {
    let feed = feed_with_resting_sell("AAPL", 10_000, 10);
    let (engine, reports) = collecting_engine(feed);
    engine.set_rng_seed(7);
    engine.set_fill_delay(Duration::ZERO);
    engine.start();

    // bid below the ask never crosses, so the venue dribbles partials
    engine.submit_order(&signal(SignalKind::Buy, "AAPL", 9_000, 8));

    wait_until(&reports, |r| {
        r.last().is_some_and(|last| last.status == OrderStatus::Filled)
    });
    engine.stop();

    let reports = reports.lock().unwrap();
    assert_eq!(reports[0].status, OrderStatus::New);

    let mut leaves = 8u32;
    for report in &reports[1..reports.len() - 1] {
        assert_eq!(report.status, OrderStatus::PartiallyFilled);
        assert!(report.exec_quantity >= 1);
        assert!(report.exec_quantity <= leaves);
        leaves -= report.exec_quantity;
        assert_eq!(report.leaves_quantity, leaves);
        assert_eq!(report.price, 9_000);
    }

    let last = reports.last().unwrap();
    assert_eq!(last.status, OrderStatus::Filled);
    assert_eq!(last.leaves_quantity, 0);
    assert_eq!(leaves, 0, "partials must exhaust the quantity");
}

#[test]
fn cancel_before_the_worker_takes_it() {
    let feed = Arc::new(MarketFeed::new(4096));
    let (engine, reports) = collecting_engine(feed);
    // worker intentionally not started: the order stays queued

    let order_id = engine.submit_order(&signal(SignalKind::Sell, "AAPL", 10_000, 4));
    assert_eq!(engine.get_order_status(order_id), OrderStatus::Pending);

    assert!(engine.cancel_order(order_id));
    assert!(!engine.cancel_order(order_id));
    assert_eq!(engine.get_order_status(order_id), OrderStatus::Rejected);

    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].status, OrderStatus::New);
    assert_eq!(reports[1].status, OrderStatus::Canceled);
    assert_eq!(reports[1].exec_quantity, 0);
    assert_eq!(reports[1].leaves_quantity, 4);
}

#[test]
fn status_reflects_queue_position() {
    let feed = Arc::new(MarketFeed::new(4096));
    let (engine, _reports) = collecting_engine(feed);

    let first = engine.submit_order(&signal(SignalKind::Buy, "AAPL", 10_000, 1));
    let second = engine.submit_order(&signal(SignalKind::Buy, "AAPL", 10_000, 1));

    assert_eq!(engine.get_order_status(first), OrderStatus::Pending);
    assert_eq!(engine.get_order_status(second), OrderStatus::New);
    assert_eq!(engine.get_order_status(999), OrderStatus::Rejected);
}

#[test]
fn ids_are_unique_and_monotonic() {
    let feed = Arc::new(MarketFeed::new(4096));
    let (engine, _reports) = collecting_engine(feed);

    let a = engine.submit_order(&signal(SignalKind::Buy, "AAPL", 1, 1));
    let b = engine.submit_order(&signal(SignalKind::Sell, "AAPL", 1, 1));
    let c = engine.submit_order(&signal(SignalKind::Buy, "AAPL", 1, 1));
    assert!(a < b && b < c);
}

#[test]
fn start_and_stop_are_idempotent() {
    let feed = feed_with_resting_sell("AAPL", 10_000, 10);
    let (engine, reports) = collecting_engine(feed);

    engine.start();
    engine.start();

    engine.submit_order(&signal(SignalKind::Buy, "AAPL", 10_100, 2));
    wait_until(&reports, |r| r.len() >= 2);

    engine.stop();
    engine.stop();

    // terminal report arrived exactly once
    let reports = reports.lock().unwrap();
    let terminal = reports
        .iter()
        .filter(|r| r.status == OrderStatus::Filled)
        .count();
    assert_eq!(terminal, 1);
}

#[test]
fn every_order_ends_in_exactly_one_terminal_state() {
    let feed = feed_with_resting_sell("AAPL", 10_000, 100);
    let (engine, reports) = collecting_engine(feed);
    engine.set_rng_seed(3);
    engine.set_fill_delay(Duration::ZERO);
    engine.start();

    let mut ids = Vec::new();
    for i in 0..8u32 {
        // alternate crossing and non-crossing buys
        let price = if i % 2 == 0 { 10_050 } else { 9_000 };
        ids.push(engine.submit_order(&signal(SignalKind::Buy, "AAPL", price, 3)));
    }

    wait_until(&reports, |r| {
        let terminals = r
            .iter()
            .filter(|rep| {
                matches!(
                    rep.status,
                    OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected
                )
            })
            .count();
        terminals == ids.len()
    });
    engine.stop();

    let reports = reports.lock().unwrap();
    for id in ids {
        let mine: Vec<&ExecutionReport> =
            reports.iter().filter(|r| r.order_id == id).collect();
        assert_eq!(mine[0].status, OrderStatus::New);
        let terminals = mine
            .iter()
            .filter(|r| {
                matches!(
                    r.status,
                    OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected
                )
            })
            .count();
        assert_eq!(terminals, 1);
        assert!(matches!(
            mine.last().unwrap().status,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected
        ));
        for middle in &mine[1..mine.len() - 1] {
            assert_eq!(middle.status, OrderStatus::PartiallyFilled);
        }
    }
}
