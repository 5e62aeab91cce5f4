use std::fs::File;

use anyhow::{Context, Result};
use memmap2::Mmap;
use ticksim::wire::{decode, Decoded, MessageType};

const NAMES: [(MessageType, &str); 7] = [
    (MessageType::AddOrder, "add_order"),
    (MessageType::ModifyOrder, "modify_order"),
    (MessageType::CancelOrder, "cancel_order"),
    (MessageType::ExecuteOrder, "execute_order"),
    (MessageType::Trade, "trade"),
    (MessageType::Snapshot, "snapshot"),
    (MessageType::Heartbeat, "heartbeat"),
];

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .context("usage: inspect <capture-file>")?;
    let file = File::open(&path).with_context(|| format!("open {path}"))?;
    let mmap = unsafe { Mmap::map(&file)? };
    let bytes = mmap.as_ref();

    let mut counts = [0u64; 8];
    let mut malformed = 0u64;
    let mut offset = 0usize;

    loop {
        match decode(bytes, offset) {
            Decoded::Message {
                message, consumed, ..
            } => {
                counts[message.payload.message_type() as usize] += 1;
                offset += consumed;
            }
            Decoded::Malformed { consumed } => {
                malformed += 1;
                offset += consumed;
            }
            Decoded::Incomplete => break,
        }
    }

    println!("bytes={} consumed={}", bytes.len(), offset);
    for (kind, name) in NAMES {
        println!("{name}={}", counts[kind as usize]);
    }
    println!("malformed={malformed}");
    println!("trailing={}", bytes.len() - offset);
    Ok(())
}
