// ABOUTME: Integration tests for the address allocator.
// ABOUTME: Concurrent uniqueness and pool bounds.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

use nsendpoint::address::{AddressAllocator, AllocationError};
use proptest::prelude::*;

#[test]
fn concurrent_allocations_are_unique() {
    let alloc = Arc::new(AddressAllocator::new(Ipv4Addr::new(10, 0, 0, 1), 16).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let alloc = Arc::clone(&alloc);
            std::thread::spawn(move || {
                (0..500)
                    .map(|_| alloc.allocate_pair().unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for pair in handle.join().unwrap() {
            assert!(seen.insert(pair.source), "duplicate {}", pair.source);
            assert!(seen.insert(pair.destination), "duplicate {}", pair.destination);
        }
    }
    assert_eq!(seen.len(), 8000);
}

#[test]
fn concurrent_exhaustion_hands_out_whole_pool_exactly_once() {
    // 10.1.0.1/24: .1 through .254
    let alloc = Arc::new(AddressAllocator::new(Ipv4Addr::new(10, 1, 0, 1), 24).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let alloc = Arc::clone(&alloc);
            std::thread::spawn(move || {
                let mut got = Vec::new();
                while let Ok(addr) = alloc.allocate() {
                    got.push(addr);
                }
                got
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }
    let unique: HashSet<_> = all.iter().copied().collect();
    assert_eq!(all.len(), 254);
    assert_eq!(unique.len(), 254);
    assert!(!unique.contains(&Ipv4Addr::new(10, 1, 0, 255)));
    assert_eq!(alloc.remaining(), 0);
    assert_eq!(
        alloc.allocate(),
        Err(AllocationError::Exhausted {
            base: Ipv4Addr::new(10, 1, 0, 1),
            prefix_len: 24
        })
    );
}

proptest! {
    #[test]
    fn addresses_stay_inside_network(base in any::<u32>(), prefix_len in 16u8..=30) {
        let base = Ipv4Addr::from(base);
        let Ok(alloc) = AddressAllocator::new(base, prefix_len) else {
            return Ok(());
        };
        let mask = u32::MAX << (32 - u32::from(prefix_len));
        let network = u32::from(base) & mask;
        let broadcast = network | !mask;

        let mut previous = None;
        for _ in 0..64 {
            match alloc.allocate() {
                Ok(addr) => {
                    let value = u32::from(addr);
                    prop_assert!(value >= u32::from(base));
                    prop_assert!(value < broadcast);
                    prop_assert_eq!(value & mask, network);
                    if let Some(prev) = previous {
                        prop_assert!(value > prev, "allocation must move forward");
                    }
                    previous = Some(value);
                }
                Err(e) => {
                    let is_exhausted = matches!(e, AllocationError::Exhausted { .. });
                    prop_assert!(is_exhausted);
                    prop_assert_eq!(alloc.remaining(), 0);
                }
            }
        }
    }
}
