// ABOUTME: IPv4 address allocator handing out unique connection address pairs.
// ABOUTME: Lock-free counter over a bounded pool; addresses are never reclaimed.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("address pool {base}/{prefix_len} exhausted")]
    Exhausted { base: Ipv4Addr, prefix_len: u8 },

    #[error("invalid address pool {base}/{prefix_len}: {reason}")]
    InvalidPool {
        base: Ipv4Addr,
        prefix_len: u8,
        reason: &'static str,
    },
}

/// Source and destination addresses of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressPair {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

/// Allocates addresses from `[base, broadcast)` of the network `base/prefix_len`.
///
/// The counter only moves forward. Once the pool is used up every further
/// allocation fails; the counter is left untouched so the allocator stays
/// consistent. Closing a connection does not give its addresses back.
#[derive(Debug)]
pub struct AddressAllocator {
    base: Ipv4Addr,
    prefix_len: u8,
    /// Exclusive upper bound of the pool.
    end: u64,
    next: AtomicU64,
}

impl AddressAllocator {
    /// Create an allocator whose first address is `base`.
    ///
    /// # Errors
    ///
    /// Returns `AllocationError::InvalidPool` if `prefix_len` is outside 1..=30
    /// or `base` is the network or broadcast address.
    pub fn new(base: Ipv4Addr, prefix_len: u8) -> Result<Self, AllocationError> {
        if !(1..=30).contains(&prefix_len) {
            return Err(AllocationError::InvalidPool {
                base,
                prefix_len,
                reason: "prefix length must be between 1 and 30",
            });
        }

        let start = u64::from(u32::from(base));
        let host_bits = 32 - u32::from(prefix_len);
        let network = start & !((1u64 << host_bits) - 1);
        let broadcast = network + (1u64 << host_bits) - 1;

        if start == network {
            return Err(AllocationError::InvalidPool {
                base,
                prefix_len,
                reason: "base address is the network address",
            });
        }

        if start >= broadcast {
            return Err(AllocationError::InvalidPool {
                base,
                prefix_len,
                reason: "base address is the broadcast address",
            });
        }

        Ok(Self {
            base,
            prefix_len,
            end: broadcast,
            next: AtomicU64::new(start),
        })
    }

    /// Allocate a single address.
    pub fn allocate(&self) -> Result<Ipv4Addr, AllocationError> {
        self.take(1).map(to_addr)
    }

    /// Allocate two consecutive addresses in one step.
    pub fn allocate_pair(&self) -> Result<AddressPair, AllocationError> {
        let first = self.take(2)?;
        Ok(AddressPair {
            source: to_addr(first),
            destination: to_addr(first + 1),
        })
    }

    /// Number of addresses still available.
    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.next.load(Ordering::Acquire))
    }

    pub fn base(&self) -> Ipv4Addr {
        self.base
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    fn take(&self, count: u64) -> Result<u64, AllocationError> {
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let after = current.checked_add(count)?;
                (after <= self.end).then_some(after)
            })
            .map_err(|_| AllocationError::Exhausted {
                base: self.base,
                prefix_len: self.prefix_len,
            })
    }
}

fn to_addr(value: u64) -> Ipv4Addr {
    // take() keeps every handed-out value below the broadcast address.
    Ipv4Addr::from(value as u32)
}
