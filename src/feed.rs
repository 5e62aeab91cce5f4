// src/feed.rs
//! Market-data dispatcher: owns the per-symbol books and subscriber tables
//! and drives the wire decoder into them.
//!
//! Ingest is single-threaded on the caller's side. Books are handed out as
//! `Arc<RwLock<_>>` because other threads (the execution worker) read best
//! prices while the ingest thread mutates.
//!
//! Two ingest paths:
//! - [`MarketFeed::process_buffer`] parses a caller-held byte slice directly
//!   and returns how many bytes it consumed on this call; a trailing partial
//!   record is left for the caller to resend.
//! - [`MarketFeed::push_bytes`] + [`MarketFeed::process_pending`] stage bytes
//!   through an internal ring buffer, so I/O chunking and record framing
//!   stay decoupled; partial records stay buffered across calls.
//!
//! Callbacks fire after the book update, in registration order, and must not
//! call back into the dispatcher or retain the message.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use dashmap::DashMap;
use hashbrown::HashMap;

use crate::book::{Order, OrderBook, Side};
use crate::ring::RingBuffer;
use crate::wire::{self, Decoded, Message, Payload};

pub type FeedCallback = Box<dyn FnMut(&Message, &str) + Send>;

pub struct MarketFeed {
    buffer: Mutex<RingBuffer>,
    books: DashMap<String, Arc<RwLock<OrderBook>>>,
    callbacks: Mutex<HashMap<String, Vec<FeedCallback>>>,
    malformed: AtomicU64,
}

impl MarketFeed {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer: Mutex::new(RingBuffer::with_capacity(buffer_size.max(2))),
            books: DashMap::new(),
            callbacks: Mutex::new(HashMap::new()),
            malformed: AtomicU64::new(0),
        }
    }

    /// Decode and apply every complete record in `data`. Returns the number
    /// of bytes consumed; anything short of a full record at the tail is not
    /// consumed.
    pub fn process_buffer(&self, data: &[u8]) -> usize {
        let mut offset = 0;
        loop {
            match wire::decode(data, offset) {
                Decoded::Incomplete => break,
                Decoded::Malformed { consumed } => {
                    self.malformed.fetch_add(1, Ordering::Relaxed);
                    offset += consumed;
                }
                Decoded::Message {
                    message,
                    symbol,
                    consumed,
                } => {
                    self.apply(&message, symbol);
                    self.notify(&message, symbol);
                    offset += consumed;
                }
            }
        }
        offset
    }

    /// Stage raw bytes into the ring buffer. Returns how many were accepted
    /// (a full buffer takes less; callers decide the overflow policy).
    pub fn push_bytes(&self, data: &[u8]) -> usize {
        self.buffer.lock().unwrap().write(data)
    }

    /// Drain complete records staged by [`push_bytes`](Self::push_bytes).
    /// A trailing partial record stays buffered for the next call. Returns
    /// bytes consumed this call.
    pub fn process_pending(&self) -> usize {
        let mut buffer = self.buffer.lock().unwrap();
        let available = buffer.read_available();
        if available == 0 {
            return 0;
        }

        let mut staged = vec![0u8; available];
        let n = buffer.read(&mut staged);
        let consumed = self.process_buffer(&staged[..n]);
        if consumed < n {
            // the buffer is drained, so the leftover goes back in order
            buffer.write(&staged[consumed..n]);
        }
        consumed
    }

    /// Register a callback for one symbol, creating its book on first use.
    pub fn subscribe(&self, symbol: &str, callback: FeedCallback) {
        self.books
            .entry(symbol.to_owned())
            .or_insert_with(|| Arc::new(RwLock::new(OrderBook::new(symbol))));
        self.callbacks
            .lock()
            .unwrap()
            .entry(symbol.to_owned())
            .or_default()
            .push(callback);
    }

    /// Drop every callback for a symbol. Its book stays.
    pub fn unsubscribe(&self, symbol: &str) {
        self.callbacks.lock().unwrap().remove(symbol);
    }

    pub fn get_order_book(&self, symbol: &str) -> Option<Arc<RwLock<OrderBook>>> {
        self.books.get(symbol).map(|entry| Arc::clone(&entry))
    }

    pub fn symbols(&self) -> Vec<String> {
        self.books.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Records skipped because of an unknown type tag or a bad symbol.
    pub fn malformed_count(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    fn apply(&self, message: &Message, symbol: &str) {
        let Some(book) = self.books.get(symbol) else {
            return;
        };
        let mut book = book.write().unwrap();
        book.touch(message.timestamp);

        match &message.payload {
            Payload::AddOrder(add) => {
                book.add_order(Order::new(
                    add.order_id,
                    add.price,
                    add.quantity,
                    Side::from_wire(add.side),
                    message.timestamp,
                    symbol,
                ));
            }
            Payload::ModifyOrder(modify) => {
                book.modify_order(modify.order_id, modify.quantity);
            }
            Payload::CancelOrder(cancel) => {
                book.cancel_order(cancel.order_id);
            }
            Payload::ExecuteOrder(execute) => {
                book.execute_order(execute.order_id, execute.exec_quantity);
            }
            // trades, snapshots and heartbeats carry no book mutation
            Payload::Trade(_) | Payload::Snapshot | Payload::Heartbeat => {}
        }
    }

    fn notify(&self, message: &Message, symbol: &str) {
        let mut callbacks = self.callbacks.lock().unwrap();
        if let Some(callbacks) = callbacks.get_mut(symbol) {
            for callback in callbacks.iter_mut() {
                callback(message, symbol);
            }
        }
    }
}
