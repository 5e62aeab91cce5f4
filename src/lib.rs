//! # ticksim - In-Process Trading Simulator
//!
//! A low-latency pipeline that ingests compact binary market data, maintains
//! per-symbol limit order books, feeds them to pluggable strategies, and
//! routes the resulting signals through a simulated execution engine.
//!
//! ## Architecture
//!
//! - **Wire codec** ([`wire`]): fixed-stride binary records with a trailing
//!   symbol, decoded in place without allocating
//! - **Order book** ([`book`]): bucketed price levels, integer fixed-point
//!   prices, memoized best bid/ask
//! - **Dispatcher** ([`feed`]): owns the books, drives the decoder, delivers
//!   per-symbol callbacks, optionally stages bytes through a ring buffer
//! - **Execution engine** ([`exec`]): background worker simulating fills
//!   against live book state, reporting through a callback
//! - **Strategies** ([`strategy`]): a host trait plus a statistical
//!   arbitrage implementation
//! - **Plumbing** ([`spsc`], [`pool`], [`ring`]): the wait-free queue, slab
//!   pool, and byte ring the rest is built on
//!
//! ## Example
//!
//! ```rust
//! use ticksim::feed::MarketFeed;
//! use ticksim::wire::{self, AddOrder, Message, Payload};
//!
//! let feed = MarketFeed::new(64 * 1024);
//! feed.subscribe("AAPL", Box::new(|_msg, _symbol| {}));
//!
//! let mut batch = Vec::new();
//! wire::encode(
//!     &mut batch,
//!     &Message {
//!         timestamp: 1,
//!         payload: Payload::AddOrder(AddOrder {
//!             order_id: 1,
//!             price: 10_000,
//!             quantity: 5,
//!             side: 0,
//!         }),
//!     },
//!     "AAPL",
//! );
//!
//! assert_eq!(feed.process_buffer(&batch), batch.len());
//! let book = feed.get_order_book("AAPL").unwrap();
//! assert_eq!(book.read().unwrap().best_bid(), Some(10_000));
//! ```
pub mod book;
pub mod config;
pub mod exec;
pub mod feed;
pub mod pool;
pub mod ring;
pub mod spsc;
pub mod strategy;
pub mod wire;
