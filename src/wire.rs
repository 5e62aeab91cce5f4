// src/wire.rs
//! Binary market-data framing: a packed fixed-size header plus a trailing
//! ASCII symbol.
//!
//! Every record is `HEADER_LEN + PAYLOAD_LEN` bytes of fixed layout (host
//! byte order, no padding between fields) followed by `symbol_length` symbol
//! bytes. The payload region is sized to the largest variant; shorter
//! variants leave the remainder unused and decoders ignore it. Decoding is
//! stateless and allocation-free: the symbol is borrowed straight out of the
//! input slice.

use bytes::{Buf, BufMut};

use crate::book::{OrderId, Price, Quantity, Timestamp};

/// timestamp (8) + type (1) + symbol_length (1)
pub const HEADER_LEN: usize = 10;
/// Sized to the largest variant (ADD_ORDER: id + price + quantity + side).
pub const PAYLOAD_LEN: usize = 21;
/// Fixed stride shared by every record, before the symbol bytes.
pub const FIXED_LEN: usize = HEADER_LEN + PAYLOAD_LEN;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    AddOrder = 1,
    ModifyOrder = 2,
    CancelOrder = 3,
    ExecuteOrder = 4,
    Trade = 5,
    Snapshot = 6,
    Heartbeat = 7,
}

impl MessageType {
    #[inline]
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(MessageType::AddOrder),
            2 => Some(MessageType::ModifyOrder),
            3 => Some(MessageType::CancelOrder),
            4 => Some(MessageType::ExecuteOrder),
            5 => Some(MessageType::Trade),
            6 => Some(MessageType::Snapshot),
            7 => Some(MessageType::Heartbeat),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddOrder {
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
    /// 0 = buy, 1 = sell
    pub side: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModifyOrder {
    pub order_id: OrderId,
    pub quantity: Quantity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CancelOrder {
    pub order_id: OrderId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecuteOrder {
    pub order_id: OrderId,
    pub exec_quantity: Quantity,
    pub exec_price: Price,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trade {
    pub price: Price,
    pub quantity: Quantity,
    /// 0 = buy aggressor, 1 = sell aggressor
    pub aggressor_side: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Payload {
    AddOrder(AddOrder),
    ModifyOrder(ModifyOrder),
    CancelOrder(CancelOrder),
    ExecuteOrder(ExecuteOrder),
    Trade(Trade),
    Snapshot,
    Heartbeat,
}

impl Payload {
    #[inline]
    pub fn message_type(&self) -> MessageType {
        match self {
            Payload::AddOrder(_) => MessageType::AddOrder,
            Payload::ModifyOrder(_) => MessageType::ModifyOrder,
            Payload::CancelOrder(_) => MessageType::CancelOrder,
            Payload::ExecuteOrder(_) => MessageType::ExecuteOrder,
            Payload::Trade(_) => MessageType::Trade,
            Payload::Snapshot => MessageType::Snapshot,
            Payload::Heartbeat => MessageType::Heartbeat,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Message {
    pub timestamp: Timestamp,
    pub payload: Payload,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Decoded<'a> {
    /// One complete record starting at the offset; `consumed` bytes long.
    Message {
        message: Message,
        symbol: &'a str,
        consumed: usize,
    },
    /// Not enough bytes for a full record; nothing consumed, retry with more.
    Incomplete,
    /// Record of known length with an unknown type tag or a bad symbol;
    /// callers should skip `consumed` bytes.
    Malformed { consumed: usize },
}

/// Decode one record from `data[offset..]`.
pub fn decode(data: &[u8], offset: usize) -> Decoded<'_> {
    let rest = match data.get(offset..) {
        Some(r) => r,
        None => return Decoded::Incomplete,
    };
    if rest.len() < FIXED_LEN {
        return Decoded::Incomplete;
    }

    let mut buf = rest;
    let timestamp = buf.get_u64_ne();
    let type_byte = buf.get_u8();
    let symbol_len = buf.get_u8() as usize;

    let consumed = FIXED_LEN + symbol_len;
    if rest.len() < consumed {
        return Decoded::Incomplete;
    }

    let Some(kind) = MessageType::from_wire(type_byte) else {
        return Decoded::Malformed { consumed };
    };

    let payload = match kind {
        MessageType::AddOrder => Payload::AddOrder(AddOrder {
            order_id: buf.get_u64_ne(),
            price: buf.get_i64_ne(),
            quantity: buf.get_u32_ne(),
            side: buf.get_u8(),
        }),
        MessageType::ModifyOrder => Payload::ModifyOrder(ModifyOrder {
            order_id: buf.get_u64_ne(),
            quantity: buf.get_u32_ne(),
        }),
        MessageType::CancelOrder => Payload::CancelOrder(CancelOrder {
            order_id: buf.get_u64_ne(),
        }),
        MessageType::ExecuteOrder => Payload::ExecuteOrder(ExecuteOrder {
            order_id: buf.get_u64_ne(),
            exec_quantity: buf.get_u32_ne(),
            exec_price: buf.get_i64_ne(),
        }),
        MessageType::Trade => Payload::Trade(Trade {
            price: buf.get_i64_ne(),
            quantity: buf.get_u32_ne(),
            aggressor_side: buf.get_u8(),
        }),
        MessageType::Snapshot => Payload::Snapshot,
        MessageType::Heartbeat => Payload::Heartbeat,
    };

    let symbol = match std::str::from_utf8(&rest[FIXED_LEN..consumed]) {
        Ok(s) if s.is_ascii() => s,
        _ => return Decoded::Malformed { consumed },
    };

    Decoded::Message {
        message: Message { timestamp, payload },
        symbol,
        consumed,
    }
}

/// Append one encoded record to `out`. The payload region is zero-padded up
/// to the fixed stride.
pub fn encode(out: &mut Vec<u8>, message: &Message, symbol: &str) {
    debug_assert!(symbol.is_ascii());
    debug_assert!(symbol.len() <= u8::MAX as usize);

    out.put_u64_ne(message.timestamp);
    out.put_u8(message.payload.message_type() as u8);
    out.put_u8(symbol.len() as u8);

    let body_start = out.len();
    match &message.payload {
        Payload::AddOrder(a) => {
            out.put_u64_ne(a.order_id);
            out.put_i64_ne(a.price);
            out.put_u32_ne(a.quantity);
            out.put_u8(a.side);
        }
        Payload::ModifyOrder(m) => {
            out.put_u64_ne(m.order_id);
            out.put_u32_ne(m.quantity);
        }
        Payload::CancelOrder(c) => {
            out.put_u64_ne(c.order_id);
        }
        Payload::ExecuteOrder(e) => {
            out.put_u64_ne(e.order_id);
            out.put_u32_ne(e.exec_quantity);
            out.put_i64_ne(e.exec_price);
        }
        Payload::Trade(t) => {
            out.put_i64_ne(t.price);
            out.put_u32_ne(t.quantity);
            out.put_u8(t.aggressor_side);
        }
        Payload::Snapshot | Payload::Heartbeat => {}
    }
    let body_len = out.len() - body_start;
    out.put_bytes(0, PAYLOAD_LEN - body_len);
    out.put_slice(symbol.as_bytes());
}
