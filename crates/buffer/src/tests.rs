use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use storage::{create_page_file, ensure_capacity, open_page_file, PAGE_SIZE};
use tempfile::tempdir;

fn pool_with_capacity(
    num_frames: usize,
    total_pages: i64,
    strategy: ReplacementStrategy,
) -> (tempfile::TempDir, BufferPool) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pages.bin");
    create_page_file(&path).unwrap();
    let mut handle = open_page_file(&path).unwrap();
    ensure_capacity(&mut handle, total_pages).unwrap();
    (dir, BufferPool::new(handle, num_frames, strategy))
}

#[test]
fn pin_miss_loads_zeroed_page() {
    let (_dir, mut pool) = pool_with_capacity(3, 4, ReplacementStrategy::Fifo);
    let page = pool.pin_page(0).unwrap();
    assert_eq!(page.data()[0], 0);
    assert_eq!(pool.get_num_read_io(), 1);
}

#[test]
fn pin_hit_does_not_touch_disk() {
    let (_dir, mut pool) = pool_with_capacity(3, 4, ReplacementStrategy::Fifo);
    pool.pin_page(0).unwrap();
    pool.pin_page(0).unwrap();
    assert_eq!(pool.get_num_read_io(), 1);
    assert_eq!(pool.get_fix_counts()[0], 2);
}

#[test]
fn unpin_decrements_fix_count() {
    let (_dir, mut pool) = pool_with_capacity(3, 4, ReplacementStrategy::Fifo);
    let ph = pool.pin_page(0).unwrap();
    pool.unpin_page(&ph).unwrap();
    assert_eq!(pool.get_fix_counts()[0], 0);
}

// A handle whose frame was evicted and repurposed for another page is
// "stale": the pool re-validates frame identity through the handle rather
// than trusting the page number alone, so a double-unpin after eviction
// reports the page as not resident rather than touching the wrong frame.
#[test]
fn unpin_with_stale_handle_fails() {
    let (_dir, mut pool) = pool_with_capacity(3, 10, ReplacementStrategy::Fifo);
    let ph0 = pool.pin_page(0).unwrap();
    pool.unpin_page(&ph0).unwrap();

    for p in [1, 2, 3] {
        let ph = pool.pin_page(p).unwrap();
        pool.unpin_page(&ph).unwrap();
    }
    assert!(!pool.get_frame_contents().contains(&0));

    let err = pool.unpin_page(&ph0).unwrap_err();
    assert!(matches!(err, DbError::ReadNonExistingPage(_)));
}

#[test]
fn mark_dirty_with_stale_handle_fails() {
    let (_dir, mut pool) = pool_with_capacity(3, 10, ReplacementStrategy::Fifo);
    let ph0 = pool.pin_page(0).unwrap();
    pool.unpin_page(&ph0).unwrap();

    for p in [1, 2, 3] {
        let ph = pool.pin_page(p).unwrap();
        pool.unpin_page(&ph).unwrap();
    }

    let err = pool.mark_dirty(&ph0).unwrap_err();
    assert!(matches!(err, DbError::ReadNonExistingPage(_)));
}

#[test]
fn pin_beyond_file_extends_it() {
    let (_dir, mut pool) = pool_with_capacity(3, 1, ReplacementStrategy::Fifo);
    let page = pool.pin_page(4).unwrap();
    assert_eq!(page.page_num(), 4);
}

// S3 — FIFO eviction order: pin/unpin 1,2,3,4 on a 3-frame pool leaves [4,2,3].
#[test]
fn fifo_eviction_order_matches_scenario_s3() {
    let (_dir, mut pool) = pool_with_capacity(3, 10, ReplacementStrategy::Fifo);
    for p in [1, 2, 3, 4] {
        let ph = pool.pin_page(p).unwrap();
        pool.unpin_page(&ph).unwrap();
    }
    assert_eq!(pool.get_frame_contents(), vec![4, 2, 3]);
}

// S4 — LRU eviction order: pin/unpin 1,2,3,1,4 on a 3-frame pool leaves [1,4,3].
#[test]
fn lru_eviction_order_matches_scenario_s4() {
    let (_dir, mut pool) = pool_with_capacity(3, 10, ReplacementStrategy::Lru);
    for p in [1, 2, 3, 1, 4] {
        let ph = pool.pin_page(p).unwrap();
        pool.unpin_page(&ph).unwrap();
    }
    assert_eq!(pool.get_frame_contents(), vec![1, 4, 3]);
}

// S5 — dirty flush: a written-then-unpinned page survives eviction and reopen.
#[test]
fn dirty_page_survives_eviction_and_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pages.bin");
    create_page_file(&path).unwrap();
    let mut handle = open_page_file(&path).unwrap();
    ensure_capacity(&mut handle, 10).unwrap();
    let mut pool = BufferPool::new(handle, 3, ReplacementStrategy::Fifo);

    let mut ph0 = pool.pin_page(0).unwrap();
    ph0.data_mut()[0] = 0x42;
    pool.mark_dirty(&ph0).unwrap();
    pool.unpin_page(&ph0).unwrap();
    drop(ph0);

    // Evict page 0 via three other distinct pins.
    for p in [1, 2, 3] {
        let ph = pool.pin_page(p).unwrap();
        pool.unpin_page(&ph).unwrap();
    }
    assert!(!pool.get_frame_contents().contains(&0));
    assert_eq!(pool.get_num_write_io(), 1);

    pool.shutdown_buffer_pool().unwrap();

    let mut handle = open_page_file(&path).unwrap();
    let page = storage::read_block(&mut handle, 0).unwrap();
    assert_eq!(page[0], 0x42);
}

// S6 — pin all frames, then miss.
#[test]
fn pinning_every_frame_then_missing_fails() {
    let (_dir, mut pool) = pool_with_capacity(3, 10, ReplacementStrategy::Fifo);
    pool.pin_page(1).unwrap();
    pool.pin_page(2).unwrap();
    pool.pin_page(3).unwrap();

    let reads_before = pool.get_num_read_io();
    let err = pool.pin_page(4).unwrap_err();
    assert!(matches!(err, DbError::NoFreeBuffer(_)));
    assert_eq!(pool.get_num_read_io(), reads_before);
}

#[test]
fn pinned_page_is_never_chosen_as_victim() {
    let (_dir, mut pool) = pool_with_capacity(2, 10, ReplacementStrategy::Fifo);
    pool.pin_page(1).unwrap();
    let ph2 = pool.pin_page(2).unwrap();
    pool.unpin_page(&ph2).unwrap();

    // Page 2 is the only eligible victim; pinning 3 must evict it, not page 1.
    pool.pin_page(3).unwrap();
    assert!(pool.get_frame_contents().contains(&1));
    assert!(!pool.get_frame_contents().contains(&2));
}

// §9: a frame dropped from the FIFO queue during a victim scan (because it
// was pinned at the time) never gets back into the queue, even once it is
// unpinned — it has permanently lost its FIFO slot.
#[test]
fn fifo_drops_pinned_frame_from_queue_permanently() {
    let (_dir, mut pool) = pool_with_capacity(2, 10, ReplacementStrategy::Fifo);
    let ph1 = pool.pin_page(1).unwrap();
    let ph2 = pool.pin_page(2).unwrap();
    pool.unpin_page(&ph2).unwrap();

    // Forces a scan that drops page 1 (still pinned) from the queue.
    let ph3 = pool.pin_page(3).unwrap();
    pool.unpin_page(&ph1).unwrap();
    pool.unpin_page(&ph3).unwrap();

    // Both resident frames (1 and 3) are now unpinned, but only 3 is still
    // in the FIFO queue, so it is the one evicted next, not 1.
    pool.pin_page(4).unwrap();
    assert!(pool.get_frame_contents().contains(&1));
    assert!(!pool.get_frame_contents().contains(&3));
}

#[test]
fn force_page_only_writes_when_dirty() {
    let (_dir, mut pool) = pool_with_capacity(2, 4, ReplacementStrategy::Lru);
    let ph = pool.pin_page(0).unwrap();
    // Not dirty: force_page should not bump write_io.
    pool.force_page(&ph).unwrap();
    assert_eq!(pool.get_num_write_io(), 0);

    pool.mark_dirty(&ph).unwrap();
    pool.force_page(&ph).unwrap();
    assert_eq!(pool.get_num_write_io(), 1);
    assert!(!pool.get_dirty_flags()[0]);
}

#[test]
fn force_flush_pool_skips_pinned_dirty_frames() {
    let (_dir, mut pool) = pool_with_capacity(2, 4, ReplacementStrategy::Lru);
    let ph = pool.pin_page(0).unwrap();
    pool.mark_dirty(&ph).unwrap();
    // Still pinned: force_flush_pool must not write it back.
    pool.force_flush_pool().unwrap();
    assert_eq!(pool.get_num_write_io(), 0);
    assert!(pool.get_dirty_flags()[0]);
}

#[test]
fn shutdown_skips_dirty_pinned_frame() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pages.bin");
    create_page_file(&path).unwrap();
    let mut handle = open_page_file(&path).unwrap();
    ensure_capacity(&mut handle, 4).unwrap();
    let mut pool = BufferPool::new(handle, 2, ReplacementStrategy::Lru);

    let ph = pool.pin_page(0).unwrap();
    pool.mark_dirty(&ph).unwrap();
    // Client bug: shutting down with an outstanding pin. The dirty pinned
    // frame must be skipped, not written.
    pool.shutdown_buffer_pool().unwrap();
    assert_eq!(pool.get_num_write_io(), 0);
}

#[test]
fn frame_buffer_is_full_page_size() {
    let (_dir, mut pool) = pool_with_capacity(1, 2, ReplacementStrategy::Fifo);
    let page = pool.pin_page(0).unwrap();
    assert_eq!(page.data().len(), PAGE_SIZE);
}

proptest! {
    // §8 invariant 4: every resident page id is distinct, for any sequence
    // of pin-then-immediately-unpin calls, under either replacement policy.
    #[test]
    fn resident_page_ids_stay_distinct(
        pages in prop::collection::vec(0i64..20, 1..50),
        strategy in prop_oneof![Just(ReplacementStrategy::Fifo), Just(ReplacementStrategy::Lru)],
    ) {
        let (_dir, mut pool) = pool_with_capacity(4, 20, strategy);
        for p in pages {
            let ph = pool.pin_page(p).unwrap();
            pool.unpin_page(&ph).unwrap();
        }

        let contents = pool.get_frame_contents();
        let resident: Vec<_> = contents.iter().filter(|&&id| id != NO_PAGE).collect();
        let mut distinct = resident.clone();
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(resident.len(), distinct.len());
    }

    // §8 invariant 5: a page pinned and never unpinned survives any number
    // of further distinct pins up to capacity - 1.
    #[test]
    fn held_pin_survives_other_traffic(
        other_pages in prop::collection::vec(1i64..50, 0..30),
    ) {
        let (_dir, mut pool) = pool_with_capacity(4, 60, ReplacementStrategy::Lru);
        let held = pool.pin_page(0).unwrap();

        for p in other_pages {
            if let Ok(ph) = pool.pin_page(p) {
                let _ = pool.unpin_page(&ph);
            }
        }

        prop_assert!(pool.get_frame_contents().contains(&0));
        drop(held);
    }
}
