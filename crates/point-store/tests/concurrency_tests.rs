//! Concurrent producers and readers against one store.

use heatmap_common::{PixelBBox, TimeWindow};
use point_store::PointStore;
use std::sync::atomic::{AtomicBool, Ordering};
use test_utils::{event_at, FIXED_NOW};

fn world() -> PixelBBox {
    PixelBBox::new(0, 0, 256, 256)
}

#[test]
fn test_concurrent_appends_are_not_lost() {
    let store = PointStore::with_index_zoom("concurrent", 6).unwrap();
    let producers = 8;
    let per_producer = 500;

    std::thread::scope(|scope| {
        for p in 0..producers {
            let store = &store;
            scope.spawn(move || {
                for i in 0..per_producer {
                    let lat = -60.0 + (p * 15) as f64;
                    let lon = -170.0 + (i % 340) as f64;
                    store.append(event_at(lat, lon, FIXED_NOW));
                }
            });
        }
    });

    assert_eq!(store.len(), producers * per_producer);
    assert_eq!(store.verify().unwrap(), producers * per_producer);

    let query = store
        .query(world(), 0, TimeWindow::through(FIXED_NOW, FIXED_NOW))
        .unwrap();
    assert_eq!(query.iter().count(), producers * per_producer);
}

#[test]
fn test_readers_see_monotonic_consistent_snapshots() {
    let store = PointStore::new("snapshots");
    let done = AtomicBool::new(false);
    let batches = 200;
    let batch_size = 10;

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for b in 0..batches {
                store.append_batch(
                    (0..batch_size).map(|i| event_at(b as f64 * 0.1, i as f64 * 0.1, FIXED_NOW)),
                );
            }
            done.store(true, Ordering::Release);
        });

        for _ in 0..4 {
            scope.spawn(|| {
                let mut last_seen = 0;
                loop {
                    let finished = done.load(Ordering::Acquire);
                    let snapshot = store.snapshot();
                    let query = snapshot
                        .query(world(), 0, TimeWindow::through(FIXED_NOW, FIXED_NOW))
                        .unwrap();
                    let seen = query.iter().count();

                    // Batches are published whole
                    assert_eq!(seen % batch_size, 0);
                    assert_eq!(seen, snapshot.len());
                    assert!(seen >= last_seen);
                    // Restarting the query on the same snapshot gives the same answer
                    assert_eq!(query.iter().count(), seen);

                    last_seen = seen;
                    if finished {
                        break;
                    }
                }
                assert_eq!(last_seen, batches * batch_size);
            });
        }
    });
}

#[test]
fn test_appends_proceed_while_a_query_is_mid_iteration() {
    let store = PointStore::new("dense");
    store.append_batch((0..1000).map(|_| event_at(10.0, 10.0, FIXED_NOW)));
    let window = TimeWindow::through(FIXED_NOW, FIXED_NOW);

    let query = store.query(world(), 0, window).unwrap();
    let mut iter = query.iter();
    let consumed = iter.by_ref().take(10).count();

    // Same cell as the open iterator
    std::thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..2000 {
                store.append(event_at(10.0, 10.0, FIXED_NOW));
            }
        });
    });

    assert_eq!(consumed + iter.count(), 1000);
    assert_eq!(store.query(world(), 0, window).unwrap().iter().count(), 3000);
    assert_eq!(store.verify().unwrap(), 3000);
}

#[test]
fn test_dense_cell_scans_and_appends_interleave() {
    let store = PointStore::new("hot");
    store.append_batch((0..5000).map(|_| event_at(-20.0, 30.0, FIXED_NOW)));
    let writing = AtomicBool::new(true);
    let window = TimeWindow::through(FIXED_NOW, FIXED_NOW);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..50 {
                store.append_batch((0..20).map(|_| event_at(-20.0, 30.0, FIXED_NOW)));
            }
            writing.store(false, Ordering::Release);
        });
        for _ in 0..3 {
            scope.spawn(|| {
                let mut scans = 0;
                while writing.load(Ordering::Acquire) || scans == 0 {
                    let snapshot = store.snapshot();
                    let seen = snapshot.query(world(), 0, window).unwrap().iter().count();
                    assert_eq!(seen, snapshot.len());
                    scans += 1;
                }
            });
        }
    });

    assert_eq!(store.len(), 6000);
    assert_eq!(store.cell_count(), 1);
}
