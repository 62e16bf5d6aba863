//! Ready/acknowledge endpoints for the byte-level side of the engine
//!
//! Both directions use the same level-sensitive contract: the side holding a
//! byte keeps `ready` asserted until it sees `ack`, and the other side makes no
//! assumption about how many ticks that takes. The engine itself buffers at
//! most one byte per direction; the queues here belong to the endpoints.
//!
//! Endpoints look at the engine outputs of the previous tick, which are the
//! signals in effect during the tick being driven.

use std::collections::VecDeque;

/// Producer-side signals for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offer {
    /// A byte is presented
    pub ready: bool,
    /// The presented byte
    pub byte: u8,
}

/// Queue of bytes fed to a transmitter
#[derive(Debug, Clone, Default)]
pub struct Sender {
    queue: VecDeque<u8>,
    sent: u64,
}

impl Sender {
    /// Create an empty sender
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes to the queue
    pub fn enqueue(&mut self, bytes: &[u8]) {
        self.queue.extend(bytes.iter().copied());
    }

    /// Bytes still waiting to be latched
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Bytes latched by the transmitter so far
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Present the head of the queue
    ///
    /// `tx_ack` is the transmitter's acknowledge in effect for this tick. An
    /// idle transmitter latches a presented byte on the same tick, so the byte
    /// leaves the queue when both are asserted.
    pub fn offer(&mut self, tx_ack: bool) -> Offer {
        let Some(&byte) = self.queue.front() else {
            return Offer::default();
        };
        if tx_ack {
            self.queue.pop_front();
            self.sent += 1;
        }
        Offer { ready: true, byte }
    }
}

/// Collects bytes from a receiver, acknowledging each one
#[derive(Debug, Clone, Default)]
pub struct Receiver {
    received: Vec<u8>,
    hold: bool,
}

impl Receiver {
    /// Create an empty receiver
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop (or resume) acknowledging bytes
    pub fn set_hold(&mut self, hold: bool) {
        self.hold = hold;
    }

    /// Bytes collected so far
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// Remove and return the collected bytes
    pub fn drain(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.received)
    }

    /// Take the byte if one is ready, returning the acknowledge for this tick
    pub fn accept(&mut self, rx_ready: bool, data: u8) -> bool {
        if !rx_ready || self.hold {
            return false;
        }
        self.received.push(data);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_holds_until_ack() {
        let mut sender = Sender::new();
        sender.enqueue(&[0x11, 0x22]);

        let offer = sender.offer(false);
        assert_eq!(offer, Offer { ready: true, byte: 0x11 });
        assert_eq!(sender.pending(), 2);

        let offer = sender.offer(true);
        assert_eq!(offer.byte, 0x11);
        assert_eq!(sender.pending(), 1);

        assert_eq!(sender.offer(true).byte, 0x22);
        assert_eq!(sender.offer(true), Offer::default());
        assert_eq!(sender.sent(), 2);
    }

    #[test]
    fn test_receiver_acknowledges_ready() {
        let mut receiver = Receiver::new();
        assert!(!receiver.accept(false, 0x99));
        assert!(receiver.accept(true, 0x42));

        receiver.set_hold(true);
        assert!(!receiver.accept(true, 0x43));
        assert_eq!(receiver.received(), &[0x42]);
        assert_eq!(receiver.drain(), vec![0x42]);
        assert!(receiver.received().is_empty());
    }
}
