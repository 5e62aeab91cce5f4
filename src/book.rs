// src/book.rs
//! Per-symbol limit order book with bucketed price levels.
//!
//! The book keeps two fixed arrays of price levels (one per side) plus a map
//! from order id to the resting order. Prices are signed 64-bit fixed-point
//! integers; all book state is maintained with integer arithmetic only.
//!
//! ## Level bucketing
//!
//! A price maps to a level slot via `price mod L` (L = 256 by default). Two
//! prices can collide on a slot; the slot then aggregates both and reports
//! the price most recently written to it. Mutations stay O(1), and
//! [`OrderBook::get_levels`] sorts the non-empty slots by their stored price
//! on the way out. Best bid/ask are memoized and refreshed with a full side
//! scan after every mutation.
//!
//! ## Example
//!
//! ```rust
//! use ticksim::book::{Order, OrderBook, Side};
//!
//! let mut book = OrderBook::new("AAPL");
//! book.add_order(Order::new(1, 10_000, 5, Side::Buy, 1, "AAPL"));
//!
//! assert_eq!(book.best_bid(), Some(10_000));
//! assert_eq!(book.best_ask(), None);
//! assert_eq!(book.depth(), (1, 0));
//! ```

use hashbrown::HashMap;
use serde::Serialize;

pub type Price = i64;
pub type OrderId = u64;
pub type Quantity = u32;
pub type Timestamp = u64;

/// Level slots per side.
pub const DEFAULT_PRICE_LEVELS: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Wire encoding: 0 = buy, anything else = sell.
    #[inline]
    pub fn from_wire(byte: u8) -> Self {
        if byte == 0 {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    #[inline]
    pub fn to_wire(self) -> u8 {
        match self {
            Side::Buy => 0,
            Side::Sell => 1,
        }
    }
}

/// One price level: the slot's current price and the aggregate resting
/// quantity across every order bucketed into it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BookLevel {
    pub price: Price,
    pub quantity: u64,
}

#[derive(Clone, Debug)]
pub struct Order {
    pub id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
    pub original_quantity: Quantity,
    pub side: Side,
    pub timestamp: Timestamp,
    pub symbol: String,
}

impl Order {
    pub fn new(
        id: OrderId,
        price: Price,
        quantity: Quantity,
        side: Side,
        timestamp: Timestamp,
        symbol: &str,
    ) -> Self {
        Self {
            id,
            price,
            quantity,
            original_quantity: quantity,
            side,
            timestamp,
            symbol: symbol.to_owned(),
        }
    }
}

pub struct OrderBook {
    symbol: String,
    bid_levels: Vec<BookLevel>,
    ask_levels: Vec<BookLevel>,
    orders: HashMap<OrderId, Order>,
    best_bid: Option<Price>,
    best_ask: Option<Price>,
    last_update: Timestamp,
}

impl OrderBook {
    pub fn new(symbol: &str) -> Self {
        Self::with_levels(symbol, DEFAULT_PRICE_LEVELS)
    }

    pub fn with_levels(symbol: &str, price_levels: usize) -> Self {
        assert!(price_levels > 0, "order book needs at least one level slot");
        Self {
            symbol: symbol.to_owned(),
            bid_levels: vec![BookLevel::default(); price_levels],
            ask_levels: vec![BookLevel::default(); price_levels],
            orders: HashMap::new(),
            best_bid: None,
            best_ask: None,
            last_update: 0,
        }
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Timestamp of the last message applied to this book. Caller-supplied;
    /// the book never reads a clock.
    #[inline]
    pub fn last_update(&self) -> Timestamp {
        self.last_update
    }

    #[inline]
    pub fn touch(&mut self, timestamp: Timestamp) {
        self.last_update = timestamp;
    }

    #[inline]
    fn level_index(&self, price: Price) -> usize {
        price.rem_euclid(self.bid_levels.len() as i64) as usize
    }

    #[inline]
    fn levels_mut(&mut self, side: Side) -> &mut [BookLevel] {
        match side {
            Side::Buy => &mut self.bid_levels,
            Side::Sell => &mut self.ask_levels,
        }
    }

    /// Store an order and add its quantity to the matching level. A second
    /// add with a live id replaces the old order, removing its old level
    /// contribution first so aggregates stay exact.
    pub fn add_order(&mut self, order: Order) {
        if let Some(old) = self.orders.remove(&order.id) {
            let idx = self.level_index(old.price);
            let level = &mut self.levels_mut(old.side)[idx];
            level.quantity = level.quantity.saturating_sub(u64::from(old.quantity));
        }

        let idx = self.level_index(order.price);
        let level = &mut self.levels_mut(order.side)[idx];
        level.price = order.price;
        level.quantity = level.quantity.saturating_add(u64::from(order.quantity));

        self.last_update = order.timestamp;
        self.orders.insert(order.id, order);
        self.update_best_prices();
    }

    /// Replace an order's remaining quantity. Returns false if the id is
    /// unknown. A new quantity of zero leaves the order resting empty; only
    /// cancel or a full execute remove it.
    pub fn modify_order(&mut self, order_id: OrderId, new_quantity: Quantity) -> bool {
        let Some(order) = self.orders.get_mut(&order_id) else {
            return false;
        };

        let old_quantity = order.quantity;
        order.quantity = new_quantity;
        let (price, side) = (order.price, order.side);

        let idx = self.level_index(price);
        let level = &mut self.levels_mut(side)[idx];
        level.quantity = level
            .quantity
            .saturating_sub(u64::from(old_quantity))
            .saturating_add(u64::from(new_quantity));

        self.update_best_prices();
        true
    }

    /// Remove an order, subtracting its remaining quantity from its level.
    /// Returns false if the id is unknown.
    pub fn cancel_order(&mut self, order_id: OrderId) -> bool {
        let Some(order) = self.orders.remove(&order_id) else {
            return false;
        };

        let idx = self.level_index(order.price);
        let level = &mut self.levels_mut(order.side)[idx];
        level.quantity = level.quantity.saturating_sub(u64::from(order.quantity));

        self.update_best_prices();
        true
    }

    /// Execute `exec_quantity` against a resting order. Returns false if the
    /// id is unknown or the execution exceeds the remaining quantity. A full
    /// execution removes the order.
    pub fn execute_order(&mut self, order_id: OrderId, exec_quantity: Quantity) -> bool {
        let Some(order) = self.orders.get_mut(&order_id) else {
            return false;
        };
        if order.quantity < exec_quantity {
            return false;
        }

        order.quantity -= exec_quantity;
        let (price, side, remaining) = (order.price, order.side, order.quantity);

        let idx = self.level_index(price);
        let level = &mut self.levels_mut(side)[idx];
        level.quantity = level.quantity.saturating_sub(u64::from(exec_quantity));

        if remaining == 0 {
            self.orders.remove(&order_id);
        }

        self.update_best_prices();
        true
    }

    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.best_bid
    }

    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.best_ask
    }

    /// Best ask minus best bid. Negative when the book is crossed; this book
    /// is a market snapshot, not a matcher, so crossed state is representable.
    #[inline]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    #[inline]
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2),
            _ => None,
        }
    }

    /// Count of non-empty (bid, ask) level slots.
    pub fn depth(&self) -> (usize, usize) {
        let bids = self.bid_levels.iter().filter(|l| l.quantity > 0).count();
        let asks = self.ask_levels.iter().filter(|l| l.quantity > 0).count();
        (bids, asks)
    }

    /// Non-empty levels for one side, best price first (descending for bids,
    /// ascending for asks), truncated to `depth`.
    pub fn get_levels(&self, side: Side, depth: usize) -> Vec<BookLevel> {
        let levels = match side {
            Side::Buy => &self.bid_levels,
            Side::Sell => &self.ask_levels,
        };

        let mut out: Vec<BookLevel> = levels.iter().filter(|l| l.quantity > 0).copied().collect();
        match side {
            Side::Buy => out.sort_by(|a, b| b.price.cmp(&a.price)),
            Side::Sell => out.sort_by(|a, b| a.price.cmp(&b.price)),
        }
        out.truncate(depth);
        out
    }

    #[inline]
    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    fn update_best_prices(&mut self) {
        self.best_bid = self
            .bid_levels
            .iter()
            .filter(|l| l.quantity > 0)
            .map(|l| l.price)
            .max();
        self.best_ask = self
            .ask_levels
            .iter()
            .filter(|l| l.quantity > 0)
            .map(|l| l.price)
            .min();
    }
}

impl OrderBook {
    /// Test hook: panics unless every book invariant holds.
    pub fn assert_invariants(&self) {
        // 1) memoized best prices must match a fresh scan
        let exp_bid = self
            .bid_levels
            .iter()
            .filter(|l| l.quantity > 0)
            .map(|l| l.price)
            .max();
        let exp_ask = self
            .ask_levels
            .iter()
            .filter(|l| l.quantity > 0)
            .map(|l| l.price)
            .min();
        assert_eq!(self.best_bid, exp_bid, "best_bid mismatch");
        assert_eq!(self.best_ask, exp_ask, "best_ask mismatch");

        // 2) every level aggregate equals the sum of the orders bucketed into it
        let slots = self.bid_levels.len();
        let mut agg_bids = vec![0u64; slots];
        let mut agg_asks = vec![0u64; slots];
        for order in self.orders.values() {
            let idx = self.level_index(order.price);
            match order.side {
                Side::Buy => agg_bids[idx] += u64::from(order.quantity),
                Side::Sell => agg_asks[idx] += u64::from(order.quantity),
            }
        }
        for (idx, level) in self.bid_levels.iter().enumerate() {
            assert_eq!(level.quantity, agg_bids[idx], "bid level qty mismatch at slot {idx}");
        }
        for (idx, level) in self.ask_levels.iter().enumerate() {
            assert_eq!(level.quantity, agg_asks[idx], "ask level qty mismatch at slot {idx}");
        }

        // 3) executed/canceled ids are really gone: every stored order still
        // fits under its level's aggregate
        for order in self.orders.values() {
            let idx = self.level_index(order.price);
            let level = match order.side {
                Side::Buy => &self.bid_levels[idx],
                Side::Sell => &self.ask_levels[idx],
            };
            assert!(
                level.quantity >= u64::from(order.quantity),
                "level aggregate below resting order quantity"
            );
        }
    }
}
