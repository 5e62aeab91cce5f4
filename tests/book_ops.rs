// tests/book_ops.rs
use ticksim::book::{Order, OrderBook, Side};

#[test]
fn empty_book_has_no_prices() {
    let book = OrderBook::new("AAPL");
    assert_eq!(book.best_bid(), None);
    assert_eq!(book.best_ask(), None);
    assert_eq!(book.spread(), None);
    assert_eq!(book.mid_price(), None);
    assert_eq!(book.depth(), (0, 0));
    assert_eq!(book.symbol(), "AAPL");
}

#[test]
fn single_buy_order() {
    let mut book = OrderBook::new("AAPL");
    book.add_order(Order::new(1, 10_000, 5, Side::Buy, 1, "AAPL"));

    assert_eq!(book.best_bid(), Some(10_000));
    assert_eq!(book.best_ask(), None);
    assert_eq!(book.depth(), (1, 0));

    let levels = book.get_levels(Side::Buy, 10);
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0].price, 10_000);
    assert_eq!(levels[0].quantity, 5);
}

#[test]
fn crossed_book_is_representable() {
    let mut book = OrderBook::new("AAPL");
    book.add_order(Order::new(1, 10_100, 3, Side::Buy, 1, "AAPL"));
    book.add_order(Order::new(2, 10_050, 4, Side::Sell, 2, "AAPL"));

    assert_eq!(book.best_bid(), Some(10_100));
    assert_eq!(book.best_ask(), Some(10_050));
    assert_eq!(book.spread(), Some(-50));
    assert_eq!(book.mid_price(), Some(10_075));
}

#[test]
fn cancel_removes_order_and_level() {
    let mut book = OrderBook::new("AAPL");
    book.add_order(Order::new(1, 10_100, 3, Side::Buy, 1, "AAPL"));
    book.add_order(Order::new(2, 10_050, 4, Side::Sell, 2, "AAPL"));

    assert!(book.cancel_order(2));
    assert_eq!(book.best_ask(), None);
    assert_eq!(book.depth(), (1, 0));
    assert!(book.order(2).is_none());

    assert!(!book.cancel_order(99));
}

#[test]
fn partial_execute_tracks_remaining() {
    let mut book = OrderBook::new("AAPL");
    book.add_order(Order::new(1, 10_000, 5, Side::Buy, 1, "AAPL"));

    assert!(book.execute_order(1, 2));
    let order = book.order(1).expect("order still resting");
    assert_eq!(order.quantity, 3);
    assert_eq!(order.original_quantity, 5);

    let levels = book.get_levels(Side::Buy, 10);
    assert_eq!(levels[0].quantity, 3);

    // more than remaining is refused without mutation
    assert!(!book.execute_order(1, 4));
    assert_eq!(book.order(1).unwrap().quantity, 3);
}

#[test]
fn full_execute_drops_the_order() {
    let mut book = OrderBook::new("AAPL");
    book.add_order(Order::new(1, 10_000, 5, Side::Buy, 1, "AAPL"));

    assert!(book.execute_order(1, 5));
    assert!(book.order(1).is_none());
    assert_eq!(book.best_bid(), None);
    assert_eq!(book.depth(), (0, 0));
}

#[test]
fn modify_adjusts_the_level_aggregate() {
    let mut book = OrderBook::new("AAPL");
    book.add_order(Order::new(1, 10_000, 5, Side::Buy, 1, "AAPL"));
    book.add_order(Order::new(2, 10_000, 7, Side::Buy, 2, "AAPL"));

    assert!(book.modify_order(1, 2));
    let levels = book.get_levels(Side::Buy, 10);
    assert_eq!(levels[0].quantity, 9);

    assert!(!book.modify_order(42, 1));
}

#[test]
fn unknown_ids_are_benign() {
    let mut book = OrderBook::new("AAPL");
    assert!(!book.modify_order(1, 10));
    assert!(!book.cancel_order(1));
    assert!(!book.execute_order(1, 1));
    assert_eq!(book.depth(), (0, 0));
}

#[test]
fn levels_sort_and_truncate() {
    let mut book = OrderBook::new("AAPL");
    for (id, price) in [(1, 10_010), (2, 10_030), (3, 10_020)] {
        book.add_order(Order::new(id, price, 1, Side::Buy, id, "AAPL"));
    }
    for (id, price) in [(4, 10_060), (5, 10_040), (6, 10_050)] {
        book.add_order(Order::new(id, price, 1, Side::Sell, id, "AAPL"));
    }

    let bids: Vec<i64> = book.get_levels(Side::Buy, 2).iter().map(|l| l.price).collect();
    assert_eq!(bids, vec![10_030, 10_020]);

    let asks: Vec<i64> = book.get_levels(Side::Sell, 2).iter().map(|l| l.price).collect();
    assert_eq!(asks, vec![10_040, 10_050]);
}
