// src/exec.rs
//! Simulated execution engine.
//!
//! Orders arrive as strategy signals, get a fresh id, and wait in a FIFO
//! queue worked by one background thread. The worker checks the current
//! book: an order that crosses the touch fills fully at the touched side's
//! price; anything else draws a uniform partial fill and re-queues. Every
//! state change goes out as an [`ExecutionReport`] through the installed
//! callback, with reports for one order always running NEW, zero or more
//! PARTIALLY_FILLED, then exactly one terminal FILLED / CANCELED / REJECTED.
//!
//! The partial-fill draw and the artificial venue latency are tunable:
//! [`ExecutionEngine::set_rng_seed`] pins the randomness for tests and
//! [`ExecutionEngine::set_fill_delay`] adjusts (or zeroes) the sleep.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::book::{OrderId, Price, Quantity, Side, Timestamp};
use crate::feed::MarketFeed;
use crate::pool::SlabPool;
use crate::strategy::{Signal, SignalKind};

const DEFAULT_FILL_DELAY: Duration = Duration::from_micros(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    Pending,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

/// Snapshot of an in-flight order's state change.
#[derive(Clone, Debug)]
pub struct ExecutionReport {
    pub order_id: OrderId,
    pub status: OrderStatus,
    /// Fill price for fills, intended price otherwise.
    pub price: Price,
    /// Quantity of the last fill.
    pub exec_quantity: Quantity,
    /// Quantity still working.
    pub leaves_quantity: Quantity,
    pub symbol: String,
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug)]
pub struct ExecutionOrder {
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
    pub side: Side,
    pub symbol: String,
    pub timestamp: Timestamp,
}

pub type ExecutionCallback = Box<dyn FnMut(&ExecutionReport) + Send>;

/// Pending map and work queue share one mutex; the condvar pairs with it.
#[derive(Default)]
struct WorkState {
    pending: HashMap<OrderId, ExecutionOrder>,
    queue: VecDeque<OrderId>,
}

struct Inner {
    market_data: Arc<MarketFeed>,
    state: Mutex<WorkState>,
    work_ready: Condvar,
    callback: Mutex<Option<ExecutionCallback>>,
    reports: Mutex<SlabPool<ExecutionReport>>,
    running: AtomicBool,
    fill_delay_ns: AtomicU64,
    rng: Mutex<StdRng>,
}

pub struct ExecutionEngine {
    inner: Arc<Inner>,
    next_order_id: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ExecutionEngine {
    pub fn new(market_data: Arc<MarketFeed>) -> Self {
        Self {
            inner: Arc::new(Inner {
                market_data,
                state: Mutex::new(WorkState::default()),
                work_ready: Condvar::new(),
                callback: Mutex::new(None),
                reports: Mutex::new(SlabPool::new()),
                running: AtomicBool::new(false),
                fill_delay_ns: AtomicU64::new(DEFAULT_FILL_DELAY.as_nanos() as u64),
                rng: Mutex::new(StdRng::from_entropy()),
            }),
            next_order_id: AtomicU64::new(1),
            worker: Mutex::new(None),
        }
    }

    /// Install the report sink. Reports are delivered from both the
    /// submitting thread (NEW, CANCELED) and the worker; the callback must
    /// not call back into the engine.
    pub fn set_execution_callback(&self, callback: impl FnMut(&ExecutionReport) + Send + 'static) {
        *self.inner.callback.lock().unwrap() = Some(Box::new(callback));
    }

    /// Artificial venue round-trip applied before each fill decision lands.
    pub fn set_fill_delay(&self, delay: Duration) {
        self.inner
            .fill_delay_ns
            .store(delay.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Reseed the partial-fill draw so tests are deterministic.
    pub fn set_rng_seed(&self, seed: u64) {
        *self.inner.rng.lock().unwrap() = StdRng::seed_from_u64(seed);
    }

    /// Spawn the worker. Idempotent.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let handle = std::thread::spawn(move || worker_loop(&inner));
        *self.worker.lock().unwrap() = Some(handle);
    }

    /// Stop and join the worker. Idempotent; also runs on drop.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::Release);
        self.inner.work_ready.notify_all();
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Turn a signal into a working order. Emits the NEW report and wakes
    /// the worker; returns the assigned id.
    pub fn submit_order(&self, signal: &Signal) -> OrderId {
        let order_id = self.next_order_id.fetch_add(1, Ordering::Relaxed);
        let order = ExecutionOrder {
            order_id,
            price: signal.price,
            quantity: signal.quantity,
            side: match signal.kind {
                SignalKind::Buy => Side::Buy,
                SignalKind::Sell => Side::Sell,
            },
            symbol: signal.symbol.clone(),
            timestamp: signal.timestamp,
        };

        // NEW goes out before the worker can see the order, so per-order
        // report sequences always open with it
        self.inner.emit(ExecutionReport {
            order_id,
            status: OrderStatus::New,
            price: signal.price,
            exec_quantity: 0,
            leaves_quantity: signal.quantity,
            symbol: signal.symbol.clone(),
            timestamp: signal.timestamp,
        });

        {
            let mut state = self.inner.state.lock().unwrap();
            state.pending.insert(order_id, order);
            state.queue.push_back(order_id);
        }

        self.inner.work_ready.notify_one();
        order_id
    }

    /// Cancel a waiting order. Fails if the id is unknown or the worker has
    /// already taken it (observed as filled).
    pub fn cancel_order(&self, order_id: OrderId) -> bool {
        let report = {
            let mut state = self.inner.state.lock().unwrap();
            if !state.pending.contains_key(&order_id) {
                return false;
            }
            // gone from the queue means the worker already took it
            if !state.queue.contains(&order_id) {
                return false;
            }
            let Some(order) = state.pending.remove(&order_id) else {
                return false;
            };
            ExecutionReport {
                order_id,
                status: OrderStatus::Canceled,
                price: order.price,
                exec_quantity: 0,
                leaves_quantity: order.quantity,
                symbol: order.symbol,
                timestamp: order.timestamp,
            }
        };

        self.inner.emit(report);
        true
    }

    /// REJECTED if unknown, FILLED once the worker has taken it, PENDING at
    /// the head of the queue, NEW while waiting behind others.
    pub fn get_order_status(&self, order_id: OrderId) -> OrderStatus {
        let state = self.inner.state.lock().unwrap();
        if !state.pending.contains_key(&order_id) {
            return OrderStatus::Rejected;
        }
        match state.queue.iter().position(|id| *id == order_id) {
            None => OrderStatus::Filled,
            Some(0) => OrderStatus::Pending,
            Some(_) => OrderStatus::New,
        }
    }
}

impl Drop for ExecutionEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(inner: &Inner) {
    loop {
        let order = {
            let mut state = inner.state.lock().unwrap();
            let order_id = loop {
                if !inner.running.load(Ordering::Acquire) {
                    return;
                }
                if let Some(id) = state.queue.pop_front() {
                    break id;
                }
                state = inner.work_ready.wait(state).unwrap();
            };
            // canceled while queued: the pending entry is gone, skip
            match state.pending.get(&order_id) {
                Some(order) => order.clone(),
                None => continue,
            }
        };

        inner.simulate_execution(&order);
    }
}

impl Inner {
    /// Reports run through the slab pool so steady-state emission does not
    /// touch the global allocator.
    fn emit(&self, report: ExecutionReport) {
        let mut callback = self.callback.lock().unwrap();
        let Some(callback) = callback.as_mut() else {
            return;
        };
        let mut reports = self.reports.lock().unwrap();
        let handle = reports.create(report);
        if let Some(report) = reports.get(handle) {
            callback(report);
        }
        reports.destroy(handle);
    }

    fn simulate_execution(&self, order: &ExecutionOrder) {
        let Some(book) = self.market_data.get_order_book(&order.symbol) else {
            self.emit(ExecutionReport {
                order_id: order.order_id,
                status: OrderStatus::Rejected,
                price: order.price,
                exec_quantity: 0,
                leaves_quantity: order.quantity,
                symbol: order.symbol.clone(),
                timestamp: order.timestamp,
            });
            self.state.lock().unwrap().pending.remove(&order.order_id);
            return;
        };

        let (best_bid, best_ask) = {
            let book = book.read().unwrap();
            (book.best_bid(), book.best_ask())
        };

        let mut fill_price = order.price;
        let can_fill = match order.side {
            Side::Buy => match best_ask {
                Some(ask) if order.price >= ask => {
                    fill_price = ask;
                    true
                }
                _ => false,
            },
            Side::Sell => match best_bid {
                Some(bid) if order.price <= bid => {
                    fill_price = bid;
                    true
                }
                _ => false,
            },
        };

        let delay = Duration::from_nanos(self.fill_delay_ns.load(Ordering::Relaxed));
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        if can_fill || order.quantity == 0 {
            self.emit(ExecutionReport {
                order_id: order.order_id,
                status: OrderStatus::Filled,
                price: fill_price,
                exec_quantity: order.quantity,
                leaves_quantity: 0,
                symbol: order.symbol.clone(),
                timestamp: order.timestamp,
            });
            self.state.lock().unwrap().pending.remove(&order.order_id);
        } else {
            let exec_quantity = self.rng.lock().unwrap().gen_range(1..=order.quantity);
            self.emit(ExecutionReport {
                order_id: order.order_id,
                status: OrderStatus::PartiallyFilled,
                price: order.price,
                exec_quantity,
                leaves_quantity: order.quantity - exec_quantity,
                symbol: order.symbol.clone(),
                timestamp: order.timestamp,
            });

            {
                let mut state = self.state.lock().unwrap();
                if let Some(pending) = state.pending.get_mut(&order.order_id) {
                    pending.quantity -= exec_quantity;
                }
                state.queue.push_back(order.order_id);
            }
            self.work_ready.notify_one();
        }
    }
}
