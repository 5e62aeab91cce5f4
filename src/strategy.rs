// src/strategy.rs
//! Strategy host and the statistical-arbitrage strategy.
//!
//! A strategy sees each updated book and may emit signals; the host runs its
//! strategies in registration order and forwards every signal, in the order
//! produced, to the installed callback. The host lives on the ingest thread
//! and has no locking of its own.

use std::collections::VecDeque;

use hashbrown::HashMap;

use crate::book::{OrderBook, Price, Quantity, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalKind {
    Buy,
    Sell,
}

/// A strategy's intent to trade.
#[derive(Clone, Debug)]
pub struct Signal {
    pub kind: SignalKind,
    pub symbol: String,
    pub price: Price,
    pub quantity: Quantity,
    /// In [0, 1]; how convinced the strategy is.
    pub confidence: f64,
    pub timestamp: Timestamp,
}

pub trait Strategy: Send {
    /// Called once when the host starts.
    fn initialize(&mut self) {}

    /// Inspect an updated book; return any signals it produces.
    fn process_update(&mut self, book: &OrderBook) -> Vec<Signal>;

    fn name(&self) -> &str;
}

pub type SignalCallback = Box<dyn FnMut(&Signal) + Send>;

#[derive(Default)]
pub struct StrategyEngine {
    strategies: Vec<Box<dyn Strategy>>,
    signal_callback: Option<SignalCallback>,
    running: bool,
}

impl StrategyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_strategy(&mut self, strategy: Box<dyn Strategy>) {
        self.strategies.push(strategy);
    }

    pub fn set_signal_callback(&mut self, callback: impl FnMut(&Signal) + Send + 'static) {
        self.signal_callback = Some(Box::new(callback));
    }

    /// Initialize every strategy and begin forwarding signals. Idempotent.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        for strategy in &mut self.strategies {
            strategy.initialize();
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run every strategy over `book`, forwarding signals as produced.
    pub fn process_order_book(&mut self, book: &OrderBook) {
        if !self.running {
            return;
        }
        for strategy in &mut self.strategies {
            let signals = strategy.process_update(book);
            if let Some(callback) = self.signal_callback.as_mut() {
                for signal in &signals {
                    callback(signal);
                }
            }
        }
    }
}

/// Pairwise mean-reversion over mid-price ratios.
///
/// Keeps a sliding window of mids per tracked symbol; once the window for
/// the updated symbol is full, computes the z-score of the current price
/// ratio against every other tracked symbol and signals when it exceeds the
/// threshold. A high ratio means the updated symbol is rich relative to the
/// pair, so the signal sells it (and vice versa).
pub struct StatArbStrategy {
    symbols: Vec<String>,
    z_score_threshold: f64,
    window_size: usize,
    price_history: HashMap<String, VecDeque<f64>>,
}

impl StatArbStrategy {
    pub fn new(symbols: Vec<String>, z_score_threshold: f64, window_size: usize) -> Self {
        Self {
            symbols,
            z_score_threshold,
            window_size: window_size.max(2),
            price_history: HashMap::new(),
        }
    }

    fn z_score(&self, symbol: &str, other: &str) -> f64 {
        let (Some(prices), Some(other_prices)) = (
            self.price_history.get(symbol),
            self.price_history.get(other),
        ) else {
            return 0.0;
        };

        let n = prices.len().min(other_prices.len());
        if n < 2 {
            return 0.0;
        }

        let ratios: Vec<f64> = (0..n)
            .map(|i| prices[prices.len() - n + i] / other_prices[other_prices.len() - n + i])
            .collect();

        let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
        let variance =
            ratios.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / ratios.len() as f64;
        let std_dev = variance.sqrt();
        if std_dev == 0.0 {
            return 0.0;
        }

        let current = ratios[ratios.len() - 1];
        let z = (current - mean) / std_dev;
        if z.is_finite() {
            z
        } else {
            0.0
        }
    }
}

impl Strategy for StatArbStrategy {
    fn initialize(&mut self) {
        for symbol in &self.symbols {
            self.price_history
                .insert(symbol.clone(), VecDeque::with_capacity(self.window_size + 1));
        }
    }

    fn process_update(&mut self, book: &OrderBook) -> Vec<Signal> {
        let mut signals = Vec::new();
        let symbol = book.symbol();

        let Some(mid) = book.mid_price() else {
            return signals;
        };
        let Some(history) = self.price_history.get_mut(symbol) else {
            // not a tracked symbol
            return signals;
        };

        history.push_back(mid as f64);
        if history.len() > self.window_size {
            history.pop_front();
        }
        if history.len() < self.window_size {
            return signals;
        }

        let timestamp = book.last_update();
        for other in &self.symbols {
            if other == symbol {
                continue;
            }

            let z = self.z_score(symbol, other);
            if z.abs() > self.z_score_threshold {
                let kind = if z > 0.0 {
                    SignalKind::Sell
                } else {
                    SignalKind::Buy
                };
                let confidence = (z.abs() / (2.0 * self.z_score_threshold)).min(1.0);
                signals.push(Signal {
                    kind,
                    symbol: symbol.to_owned(),
                    price: mid,
                    quantity: 100,
                    confidence,
                    timestamp,
                });
            }
        }

        signals
    }

    fn name(&self) -> &str {
        "stat_arb"
    }
}
