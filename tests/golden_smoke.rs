// tests/golden_smoke.rs
use std::process::Command;

use ticksim::wire::{self, AddOrder, Message, Payload};

fn capture_bytes() -> Vec<u8> {
    let mut data = Vec::new();
    for (order_id, price, side, symbol) in [
        (1u64, 10_000i64, 0u8, "AAPL"),
        (2, 10_100, 1, "AAPL"),
        (3, 20_000, 0, "MSFT"),
    ] {
        wire::encode(
            &mut data,
            &Message {
                timestamp: order_id,
                payload: Payload::AddOrder(AddOrder {
                    order_id,
                    price,
                    quantity: 10,
                    side,
                }),
            },
            symbol,
        );
    }
    data
}

#[test]
fn golden_smoke_replays_a_capture() {
    let tmp = tempfile::tempdir().unwrap();
    let config_path = tmp.path().join("sim.conf");
    let capture_path = tmp.path().join("capture.bin");
    let out_path = tmp.path().join("final.json");

    std::fs::write(
        &config_path,
        "# smoke config\n\
         symbols = AAPL,MSFT\n\
         market_data.buffer_size = 65536\n\
         strategy.stat_arb.window_size = 4\n",
    )
    .unwrap();
    std::fs::write(&capture_path, capture_bytes()).unwrap();

    let exe = env!("CARGO_BIN_EXE_ticksim");
    let status = Command::new(exe)
        .args([
            "--config",
            config_path.to_str().unwrap(),
            "--file",
            capture_path.to_str().unwrap(),
            "--out",
            out_path.to_str().unwrap(),
        ])
        .status()
        .unwrap();
    assert!(status.success());

    let out = std::fs::read_to_string(&out_path).unwrap();
    assert!(out.contains(r#""type":"final""#));
    assert!(out.contains(r#""AAPL""#));
    assert!(out.contains(r#""MSFT""#));
    assert!(out.contains("10000"));
}

#[test]
fn golden_smoke_generates_batches() {
    let tmp = tempfile::tempdir().unwrap();
    let out_path = tmp.path().join("final.json");

    let exe = env!("CARGO_BIN_EXE_ticksim");
    let status = Command::new(exe)
        .args([
            "--batches",
            "3",
            "--batch-size",
            "200",
            "--throttle-ms",
            "0",
            "--seed",
            "11",
            "--out",
            out_path.to_str().unwrap(),
        ])
        .status()
        .unwrap();
    assert!(status.success());

    let out = std::fs::read_to_string(&out_path).unwrap();
    assert!(out.contains(r#""type":"final""#));
    assert!(out.contains(r#""symbols""#));
}
