//! Register store behind a request/acknowledge bus cycle
//!
//! The store is a row of 16-bit registers served by a small cycle state machine.
//! Callers never drive the bus signals directly; [`StoreClient`] wraps a whole
//! cycle into `put(address, value)` and `get(address)` with a bounded wait.
//!
//! ```text
//! RESET --> INACTIVE --stb--> READING --!cyc--> INACTIVE (ack)
//!              |
//!              +--stb & we--> WRITING --!cyc--> INACTIVE (ack)
//! ```

use crate::error::{Result, UartError};
use tracing::debug;

/// Ticks a client waits for the store before giving up
pub const MAX_WAIT_TICKS: u32 = 50;

/// Bus cycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BusState {
    /// Coming out of reset
    Reset,
    /// No cycle in progress
    Inactive,
    /// Read cycle, output follows the addressed register
    Reading,
    /// Write cycle, addressed register follows the input
    Writing,
}

/// Bus signals driven by the client for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusInputs {
    /// Cycle in progress
    pub cyc: bool,
    /// Transfer request
    pub stb: bool,
    /// Write enable
    pub we: bool,
    /// Register address
    pub address: u16,
    /// Write data
    pub data: u16,
    /// Abort the cycle
    pub reset: bool,
}

/// Bus signals presented by the store after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusOutputs {
    /// Store is idle and waiting for a request
    pub stall: bool,
    /// Cycle finished on the last tick
    pub ack: bool,
    /// Read data
    pub data: u16,
}

/// Anything a [`StoreClient`] can run bus cycles against
pub trait BusTarget {
    /// Advance one tick
    fn step(&mut self, inputs: BusInputs) -> BusOutputs;

    /// Signals as they stand after the last tick
    fn outputs(&self) -> BusOutputs;
}

/// `N` registers of 16 bits
///
/// Addresses past the end fold onto the last register.
#[derive(Debug, Clone)]
pub struct RegisterStore<const N: usize> {
    registers: [u16; N],
    state: BusState,
    ack: bool,
    data_out: u16,
}

impl<const N: usize> RegisterStore<N> {
    /// Create a store with all registers cleared, in its reset state
    pub fn new() -> Result<Self> {
        if N == 0 {
            return Err(UartError::invalid_configuration(
                "register store needs at least one register",
            ));
        }
        Ok(RegisterStore {
            registers: [0; N],
            state: BusState::Reset,
            ack: false,
            data_out: 0,
        })
    }

    /// Current cycle state
    pub fn state(&self) -> BusState {
        self.state
    }

    /// Number of registers
    pub fn len(&self) -> usize {
        N
    }

    /// Always false; a store has at least one register
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Register contents, bypassing the bus
    pub fn peek(&self, address: u16) -> u16 {
        self.registers[Self::index(address)]
    }

    fn index(address: u16) -> usize {
        usize::from(address).min(N.saturating_sub(1))
    }

    fn finish(&mut self, inputs: &BusInputs) {
        if inputs.reset {
            self.state = BusState::Reset;
        } else if !inputs.cyc {
            self.ack = true;
            self.state = BusState::Inactive;
        }
    }
}

impl<const N: usize> BusTarget for RegisterStore<N> {
    fn step(&mut self, inputs: BusInputs) -> BusOutputs {
        match self.state {
            BusState::Reset => self.state = BusState::Inactive,
            BusState::Inactive => {
                self.ack = false;
                if inputs.stb {
                    self.state = if inputs.we {
                        BusState::Writing
                    } else {
                        BusState::Reading
                    };
                }
            }
            BusState::Reading => {
                self.data_out = self.registers[Self::index(inputs.address)];
                self.finish(&inputs);
            }
            BusState::Writing => {
                self.registers[Self::index(inputs.address)] = inputs.data;
                self.finish(&inputs);
            }
        }
        self.outputs()
    }

    fn outputs(&self) -> BusOutputs {
        BusOutputs {
            stall: self.state == BusState::Inactive,
            ack: self.ack,
            data: self.data_out,
        }
    }
}

/// Runs complete bus cycles with a bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreClient {
    max_wait: u32,
}

impl StoreClient {
    /// Client waiting at most [`MAX_WAIT_TICKS`] per phase
    pub fn new() -> Self {
        StoreClient {
            max_wait: MAX_WAIT_TICKS,
        }
    }

    /// Client with a custom wait bound
    pub fn with_max_wait(max_wait: u32) -> Self {
        StoreClient { max_wait }
    }

    fn wait(
        &self,
        target: &mut impl BusTarget,
        what: &str,
        idle: BusInputs,
        done: impl Fn(&BusOutputs) -> bool,
    ) -> Result<BusOutputs> {
        let mut out = target.outputs();
        for _ in 0..self.max_wait {
            if done(&out) {
                return Ok(out);
            }
            out = target.step(idle);
        }
        if done(&out) {
            return Ok(out);
        }
        Err(UartError::timeout(format!(
            "no {} within {} ticks",
            what, self.max_wait
        )))
    }

    fn cycle(&self, target: &mut impl BusTarget, we: bool, address: u16, data: u16) -> Result<BusOutputs> {
        let idle = BusInputs {
            address,
            data,
            ..BusInputs::default()
        };
        self.wait(target, "idle bus", idle, |out| out.stall)?;
        target.step(BusInputs {
            cyc: true,
            stb: true,
            we,
            ..idle
        });
        self.wait(target, "acknowledge", idle, |out| out.ack)
    }

    /// Write `value` to `address`
    pub fn put(&self, target: &mut impl BusTarget, address: u16, value: u16) -> Result<()> {
        self.cycle(target, true, address, value)?;
        Ok(())
    }

    /// Read the register at `address`
    pub fn get(&self, target: &mut impl BusTarget, address: u16) -> Result<u16> {
        Ok(self.cycle(target, false, address, 0)?.data)
    }
}

impl Default for StoreClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Key to slot assignment by truncating the key to the address width
#[derive(Debug, Clone)]
pub struct KeySlots {
    mask: u16,
    owners: Vec<Option<u16>>,
}

impl KeySlots {
    /// Table with `2^depth` slots
    pub fn new(depth: u32) -> Result<Self> {
        if depth > u16::BITS {
            return Err(UartError::invalid_configuration(format!(
                "slot depth {} exceeds {}",
                depth,
                u16::BITS
            )));
        }
        let capacity = 1usize << depth;
        Ok(KeySlots {
            mask: (capacity - 1) as u16,
            owners: vec![None; capacity],
        })
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.owners.len()
    }

    /// Slot a key maps to
    pub fn slot(&self, key: u16) -> u16 {
        key & self.mask
    }

    /// Slot currently owned by `key`
    pub fn lookup(&self, key: u16) -> Option<u16> {
        let slot = self.slot(key);
        (self.owners[usize::from(slot)] == Some(key)).then_some(slot)
    }

    /// Assign `key` its slot, failing if another key already holds it
    pub fn claim(&mut self, key: u16) -> Result<u16> {
        let slot = self.slot(key);
        match self.owners[usize::from(slot)] {
            Some(owner) if owner != key => Err(UartError::capacity_exceeded(format!(
                "slot {} already holds key {}",
                slot, owner
            ))),
            _ => {
                self.owners[usize::from(slot)] = Some(key);
                Ok(slot)
            }
        }
    }

    /// Free the slot owned by `key`
    pub fn release(&mut self, key: u16) -> bool {
        match self.lookup(key) {
            Some(slot) => {
                self.owners[usize::from(slot)] = None;
                true
            }
            None => false,
        }
    }
}

/// Key/value store: truncated keys select registers of a [`RegisterStore`]
#[derive(Debug, Clone)]
pub struct KeyValueStore<const N: usize> {
    slots: KeySlots,
    store: RegisterStore<N>,
    client: StoreClient,
}

impl<const N: usize> KeyValueStore<N> {
    /// Create an empty store; `N` must be a power of two
    pub fn new() -> Result<Self> {
        if !N.is_power_of_two() {
            return Err(UartError::invalid_configuration(format!(
                "key/value capacity {} is not a power of two",
                N
            )));
        }
        Ok(KeyValueStore {
            slots: KeySlots::new(N.trailing_zeros())?,
            store: RegisterStore::new()?,
            client: StoreClient::new(),
        })
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        N
    }

    /// Store `value` under `key`, returning the slot used
    pub fn insert(&mut self, key: u16, value: u16) -> Result<u16> {
        let slot = self.slots.claim(key)?;
        self.client.put(&mut self.store, slot, value)?;
        debug!(key, slot, value, "key stored");
        Ok(slot)
    }

    /// Value stored under `key`, if any
    pub fn recall(&mut self, key: u16) -> Result<Option<u16>> {
        match self.slots.lookup(key) {
            Some(slot) => self.client.get(&mut self.store, slot).map(Some),
            None => Ok(None),
        }
    }

    /// Value held in `slot`, whichever key owns it
    pub fn recall_slot(&mut self, slot: u16) -> Result<u16> {
        self.client.get(&mut self.store, slot)
    }

    /// Forget `key`; the register keeps its last value
    pub fn remove(&mut self, key: u16) -> bool {
        self.slots.release(key)
    }
}
