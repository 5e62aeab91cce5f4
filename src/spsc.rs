// src/spsc.rs
//! Bounded wait-free single-producer/single-consumer queue.
//!
//! Head and tail are monotonically increasing 64-bit counters on separate
//! cache lines; a slot index is `counter % capacity`. The producer publishes
//! with a release store of `head`, the consumer with a release store of
//! `tail`; each side reads the other's counter with acquire. No locks, no
//! waiting: a full queue rejects the push and hands the value back.
//!
//! ## Contract
//!
//! Exactly one thread may push and exactly one thread may pop at any time.
//! The queue itself does not enforce this; both handles go through `&self`,
//! so the single-producer/single-consumer discipline is on the caller.
//! Violating it is a data race.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};

#[repr(align(64))]
struct CacheLine(AtomicU64);

pub struct SpscQueue<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// next write counter
    head: CacheLine,
    /// next read counter
    tail: CacheLine,
}

unsafe impl<T: Send> Send for SpscQueue<T> {}
unsafe impl<T: Send> Sync for SpscQueue<T> {}

impl<T> SpscQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "spsc queue capacity must be non-zero");
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        Self {
            slots,
            head: CacheLine(AtomicU64::new(0)),
            tail: CacheLine(AtomicU64::new(0)),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Enqueue from the producer thread. Hands the value back if the queue
    /// is full; the caller picks the overflow policy.
    pub fn try_push(&self, value: T) -> Result<(), T> {
        let head = self.head.0.load(Ordering::Relaxed);
        let tail = self.tail.0.load(Ordering::Acquire);
        if head - tail >= self.slots.len() as u64 {
            return Err(value);
        }

        let slot = self.slots[(head % self.slots.len() as u64) as usize].get();
        unsafe { (*slot).write(value) };

        self.head.0.store(head + 1, Ordering::Release);
        Ok(())
    }

    /// Dequeue from the consumer thread.
    pub fn try_pop(&self) -> Option<T> {
        let tail = self.tail.0.load(Ordering::Relaxed);
        let head = self.head.0.load(Ordering::Acquire);
        if tail >= head {
            return None;
        }

        let slot = self.slots[(tail % self.slots.len() as u64) as usize].get();
        let value = unsafe { (*slot).assume_init_read() };

        self.tail.0.store(tail + 1, Ordering::Release);
        Some(value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.0.load(Ordering::Acquire);
        let tail = self.tail.0.load(Ordering::Acquire);
        (head - tail) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.slots.len()
    }

    /// Pop-and-drop everything queued. Consumer side only.
    pub fn clear(&self) {
        while self.try_pop().is_some() {}
    }
}

impl<T> Drop for SpscQueue<T> {
    fn drop(&mut self) {
        let head = *self.head.0.get_mut();
        let tail = *self.tail.0.get_mut();
        for i in tail..head {
            let slot = self.slots[(i % self.slots.len() as u64) as usize].get_mut();
            unsafe { slot.assume_init_drop() };
        }
    }
}
