//! Concurrency tests for the lock-free bump arena

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use strata_memory::allocator::BumpArena;

#[test]
fn test_concurrent_grants_are_disjoint() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 128;
    const SIZE: usize = 12;

    let arena = Arc::new(BumpArena::new(THREADS * PER_THREAD * SIZE).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let arena = Arc::clone(&arena);
            thread::spawn(move || {
                let mut grants = Vec::with_capacity(PER_THREAD);
                for _ in 0..PER_THREAD {
                    let ptr = arena.try_bump(SIZE).expect("arena sized for every request");
                    // SAFETY: the grant is exclusively ours.
                    unsafe { ptr.as_ptr().write_bytes(t as u8, SIZE) };
                    grants.push(ptr.as_ptr() as usize);
                }
                (t, grants)
            })
        })
        .collect();

    let mut all = Vec::with_capacity(THREADS * PER_THREAD);
    for handle in handles {
        let (t, grants) = handle.join().unwrap();
        for &addr in &grants {
            // nobody else wrote into our slice
            let bytes = unsafe { std::slice::from_raw_parts(addr as *const u8, SIZE) };
            assert!(bytes.iter().all(|&b| b == t as u8));
        }
        all.extend(grants);
    }

    assert_eq!(arena.available(), 0);
    assert_eq!(arena.used(), THREADS * PER_THREAD * SIZE);

    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), THREADS * PER_THREAD, "a slice was granted twice");
    assert!(all.windows(2).all(|w| w[1] - w[0] >= SIZE));
    assert!(all.iter().all(|&addr| arena.contains(addr)));
}

#[test]
fn test_concurrent_saturation_loses_nothing() {
    const THREADS: usize = 6;
    const CAPACITY: usize = 1000;

    let arena = Arc::new(BumpArena::new(CAPACITY).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let arena = Arc::clone(&arena);
            thread::spawn(move || {
                let mut granted = 0usize;
                while arena.try_bump(8).is_some() {
                    granted += 8;
                }
                granted
            })
        })
        .collect();

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    // 1000 is not a multiple of 8; the 4-byte tail stays unclaimed
    assert_eq!(total, CAPACITY / 8 * 8);
    assert_eq!(arena.used(), total);
    assert_eq!(arena.available(), CAPACITY - total);
    assert!(arena.try_bump(4).is_some());
    assert_eq!(arena.available(), 0);
}

#[test]
fn test_cursor_is_monotonic_under_contention() {
    let arena = Arc::new(BumpArena::new(64 * 1024).unwrap());
    let done = Arc::new(AtomicBool::new(false));

    let observer = {
        let arena = Arc::clone(&arena);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut last = arena.cursor();
            while !done.load(Ordering::Acquire) {
                let now = arena.cursor();
                assert!(now >= last, "cursor moved backwards");
                assert!(now <= arena.end_addr());
                last = now;
            }
        })
    };

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let arena = Arc::clone(&arena);
            thread::spawn(move || while arena.try_bump(4).is_some() {})
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::Release);
    observer.join().unwrap();

    assert_eq!(arena.cursor(), arena.end_addr());
}
