//! Integration tests for the tiered allocator

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use strata_memory::prelude::*;

fn reference_config() -> TieredConfig {
    TieredConfig::new()
        .with_arena_size(1024)
        .with_class_block_counts([4, 4, 4])
        .with_debug(false)
}

#[test]
fn test_reference_scenario() {
    let alloc = TieredAllocator::new(reference_config()).expect("Failed to create allocator");
    assert_eq!(alloc.arena_used(), 112);

    unsafe {
        // arena grant lands after the pool backing
        let scratch = alloc.allocate(3, Tier::Arena).expect("Arena allocation failed");
        let (start, end) = alloc.arena_range();
        let addr = scratch.as_ptr() as usize;
        assert!(addr >= start + 112 && addr + 4 <= end);

        let mut pooled = Vec::new();
        for i in 0..4u8 {
            let ptr = alloc.allocate(4, Tier::Pooled).expect("Pooled allocation failed");
            assert!(alloc.contains(ptr));
            ptr.as_ptr().write(i);
            pooled.push(ptr);
        }

        // class 0 is exhausted; the fifth request lands on the heap
        let fifth = alloc.allocate(4, Tier::Pooled).expect("Fallback failed");
        assert!(!alloc.contains(fifth));
        fifth.as_ptr().write_bytes(0xEE, 4);

        for (i, ptr) in pooled.iter().enumerate() {
            assert_eq!(*ptr.as_ptr(), i as u8);
        }

        // routed to the heap free; pool counters untouched
        alloc.deallocate(fifth);
        assert_eq!(alloc.class_stats()[0].free_count, 0);

        for ptr in pooled {
            alloc.deallocate(ptr);
        }
        assert_eq!(alloc.class_stats()[0].free_count, 4);

        alloc.release();
    }
}

#[test]
fn test_exhaustion_never_exceeds_block_count() {
    let alloc = TieredAllocator::new(reference_config()).unwrap();

    unsafe {
        for class_size in [4usize, 8, 16] {
            let mut in_arena = 0;
            let mut ptrs = Vec::new();
            for _ in 0..10 {
                let ptr = alloc.allocate(class_size, Tier::Pooled).unwrap();
                if alloc.contains(ptr) {
                    in_arena += 1;
                }
                ptrs.push(ptr);
            }
            assert_eq!(in_arena, 4, "class serving {class_size}B");
            for ptr in ptrs {
                alloc.deallocate(ptr);
            }
        }

        let stats = alloc.class_stats();
        assert!(stats.iter().all(|s| s.allocated() == 0));
    }
}

#[test]
fn test_dealloc_dispatch_by_class() {
    let alloc = TieredAllocator::new(reference_config()).unwrap();

    unsafe {
        let small = alloc.allocate(4, Tier::Pooled).unwrap();
        let mid = alloc.allocate(8, Tier::Pooled).unwrap();
        let large = alloc.allocate(16, Tier::Pooled).unwrap();

        alloc.deallocate(mid);
        let stats = alloc.class_stats();
        assert_eq!(stats[0].free_count, 3);
        assert_eq!(stats[1].free_count, 4);
        assert_eq!(stats[2].free_count, 3);

        alloc.deallocate(small);
        alloc.deallocate(large);
        assert!(alloc.class_stats().iter().all(|s| s.free_count == 4));
    }
}

#[test]
fn test_bump_grants_never_touch_free_lists() {
    let alloc = TieredAllocator::new(reference_config()).unwrap();

    unsafe {
        let before = alloc.class_stats();
        let grants: Vec<_> = (0..8)
            .map(|_| alloc.allocate(4, Tier::Arena).unwrap())
            .collect();
        for ptr in grants {
            alloc.deallocate(ptr);
        }
        assert_eq!(alloc.class_stats(), before);

        // pooled tier still hands out its own blocks
        let p = alloc.allocate(4, Tier::Pooled).unwrap();
        assert!(alloc.contains(p));
        alloc.deallocate(p);
    }
}

#[test]
fn test_heap_tier_always_outside_arena() {
    let alloc = TieredAllocator::new(reference_config()).unwrap();

    unsafe {
        for size in [0usize, 1, 4, 100, 4096] {
            let ptr = alloc.allocate(size, Tier::Heap).unwrap();
            assert!(!alloc.contains(ptr));
            assert_eq!(ptr.as_ptr() as usize % 4, 0);
            alloc.deallocate(ptr);
        }
    }
}

#[test]
fn test_oversized_request_falls_through_to_heap() {
    let alloc = TieredAllocator::new(reference_config()).unwrap();

    unsafe {
        let arena = alloc.allocate(2048, Tier::Arena).unwrap();
        let pooled = alloc.allocate(2048, Tier::Pooled).unwrap();
        assert!(!alloc.contains(arena));
        assert!(!alloc.contains(pooled));
        assert_eq!(alloc.arena_used(), 112);
        alloc.deallocate(arena);
        alloc.deallocate(pooled);
    }
}

#[test]
fn test_release_then_pooled_falls_back() {
    let alloc = TieredAllocator::new(reference_config()).unwrap();

    unsafe {
        alloc.release();
        assert!(alloc.is_released());

        let ptr = alloc.allocate(8, Tier::Pooled).unwrap();
        assert!(!alloc.contains(ptr));
        alloc.deallocate(ptr);
    }
}

#[test]
fn test_trace_records_through_shared_sink() {
    let events = Arc::new(Mutex::new(Vec::<AllocEvent>::new()));
    let sink = Arc::clone(&events);
    let config = reference_config().with_arena_size(128).with_debug(true);

    let alloc = TieredAllocator::with_logger(config, move |event: &AllocEvent| {
        sink.lock().push(*event);
    })
    .unwrap();

    unsafe {
        // 112 backing + 16 bump fills the arena
        let a = alloc.allocate(16, Tier::Arena).unwrap();
        let b = alloc.allocate(1, Tier::Arena).unwrap();
        alloc.deallocate(b);
        alloc.deallocate(a);
    }

    let events = events.lock();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].tier, Tier::Arena);
    assert!(!events[0].fallback);
    assert_eq!(events[1].requested, 1);
    assert!(events[1].fallback);
    assert!(events[1].succeeded());
    assert!(events[1].to_string().ends_with("(fallback on heap)"));
}

#[test]
fn test_pooled_tier_behind_caller_lock() {
    const THREADS: usize = 4;
    const ROUNDS: usize = 200;

    let alloc = Arc::new(TieredAllocator::new(reference_config()).unwrap());
    let lock = Arc::new(Mutex::new(()));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let alloc = Arc::clone(&alloc);
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    let size = 4 << ((t + round) % 3);
                    let ptr = {
                        let _guard = lock.lock();
                        // SAFETY: pooled access serialized by `lock`.
                        unsafe { alloc.allocate(size, Tier::Pooled) }.unwrap()
                    };
                    // SAFETY: we own `size` bytes at `ptr` until freed.
                    unsafe { ptr.as_ptr().write_bytes(t as u8, size) };
                    assert_eq!(unsafe { *ptr.as_ptr() }, t as u8);
                    let _guard = lock.lock();
                    // SAFETY: serialized by `lock`; freed exactly once.
                    unsafe { alloc.deallocate(ptr) };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let _guard = lock.lock();
    let stats = unsafe { alloc.class_stats() };
    assert!(stats.iter().all(|s| s.allocated() == 0));
}

#[test]
fn test_arena_tier_concurrent_with_fallback() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 64;

    let config = TieredConfig::new()
        .with_arena_size(4096)
        .with_class_block_counts(Vec::<u32>::new())
        .with_debug(false);
    let alloc = Arc::new(TieredAllocator::new(config).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let alloc = Arc::clone(&alloc);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|_| {
                        // SAFETY: the arena and heap tiers need no external lock.
                        let ptr = unsafe { alloc.allocate(16, Tier::Arena) }.unwrap();
                        (ptr.as_ptr() as usize, alloc.contains(ptr))
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut in_arena = Vec::new();
    let mut on_heap = Vec::new();
    for handle in handles {
        for (addr, inside) in handle.join().unwrap() {
            if inside {
                in_arena.push(addr);
            } else {
                on_heap.push(addr);
            }
        }
    }

    // 8 * 64 * 16 = 8192 requested against 4096: exactly half fit
    assert_eq!(in_arena.len(), 4096 / 16);
    assert_eq!(on_heap.len(), THREADS * PER_THREAD - 4096 / 16);
    assert_eq!(alloc.arena_available(), 0);

    in_arena.sort_unstable();
    assert!(in_arena.windows(2).all(|w| w[1] - w[0] >= 16));

    for addr in on_heap {
        let ptr = std::ptr::NonNull::new(addr as *mut u8).unwrap();
        // SAFETY: heap grants from this allocator, freed once.
        unsafe { alloc.deallocate(ptr) };
    }
}

#[test]
fn test_invalid_configs_rejected() {
    let zero = TieredConfig::new().with_arena_size(0);
    assert_eq!(
        TieredAllocator::new(zero).unwrap_err().code(),
        "MEM:CONFIG:INVALID"
    );

    let too_many = TieredConfig::new().with_class_block_counts(vec![1; 25]);
    assert!(TieredAllocator::new(too_many).is_err());

    let too_big = reference_config().with_arena_size(100);
    assert!(matches!(
        TieredAllocator::new(too_big),
        Err(MemoryError::ArenaExhausted { .. })
    ));
}

#[test]
fn test_presets_construct() {
    for config in [
        TieredConfig::default(),
        TieredConfig::production(),
        TieredConfig::debug(),
        TieredConfig::embedded(),
    ] {
        let alloc = TieredAllocator::with_logger(config.clone(), NoopLogger).unwrap();
        assert_eq!(alloc.config(), &config);
        assert_eq!(alloc.arena_used(), config.pool_backing_bytes().unwrap());
    }
}
