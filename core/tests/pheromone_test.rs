use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use antroute_core::{AntRouteError, EdgeKey, PheromoneTable, Reinforcement};

fn single_edge(level: f32) -> (Arc<PheromoneTable>, EdgeKey) {
    let key = EdgeKey::new(1, 2);
    (Arc::new(PheromoneTable::new([key], level)), key)
}

#[test]
fn concurrent_reinforcement_loses_no_updates() {
    let (table, key) = single_edge(0.01);

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let table = Arc::clone(&table);
            thread::spawn(move || table.reinforce(&key, 0.01).unwrap())
        })
        .collect();
    for h in handles {
        h.join().expect("reinforce thread panicked");
    }

    // Every increment is the same, so any serial order yields the same sum.
    let mut expected = 0.01f32;
    for _ in 0..50 {
        expected += 0.01;
    }
    assert_eq!(table.get(&key).unwrap(), expected.min(1.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reinforcement_from_tasks() {
    let (table, key) = single_edge(0.01);

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let table = Arc::clone(&table);
        tasks.push(tokio::spawn(async move {
            for _ in 0..5 {
                table.reinforce(&key, 0.01).unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }

    let level = table.get(&key).unwrap();
    assert!((level - 0.51).abs() < 1e-4, "level was {}", level);
}

#[test]
fn saturated_reinforcement_is_a_fixed_point() {
    let (table, key) = single_edge(0.995);
    for _ in 0..100 {
        assert_eq!(
            table.reinforce(&key, 0.01).unwrap(),
            Reinforcement::Saturated { level: 0.995 }
        );
    }
    assert_eq!(table.get(&key).unwrap(), 0.995);
}

#[test]
fn one_decay_tick() {
    let (table, key) = single_edge(0.5);
    assert_eq!(table.decay_all(0.97).unwrap(), 1);
    assert!((table.get(&key).unwrap() - 0.485).abs() < 1e-6);
}

#[test]
fn levels_stay_in_unit_interval_under_mixed_load() {
    let keys: Vec<EdgeKey> = (1..=8).map(|v| EdgeKey::new(v, v + 1)).collect();
    let table = Arc::new(PheromoneTable::new(keys.clone(), 0.01));

    let decayer = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            for _ in 0..200 {
                table.decay_all(0.97).unwrap();
            }
        })
    };
    let reinforcers: Vec<_> = (0..4)
        .map(|i| {
            let table = Arc::clone(&table);
            let keys = keys.clone();
            thread::spawn(move || {
                for n in 0..500 {
                    let key = keys[(i + n) % keys.len()];
                    table.reinforce(&key, 0.02).unwrap();
                }
            })
        })
        .collect();

    decayer.join().unwrap();
    for r in reinforcers {
        r.join().unwrap();
    }

    for (_, level) in table.snapshot() {
        assert!((0.0..=1.0).contains(&level), "level {} out of range", level);
    }
}

#[test]
fn decay_never_goes_negative() {
    let (table, key) = single_edge(0.3);
    for _ in 0..2_000 {
        table.decay_all(0.5).unwrap();
    }
    assert!(table.get(&key).unwrap() >= 0.0);
}

#[test]
fn snapshot_lists_every_registered_edge_once() {
    let table = PheromoneTable::new(
        [EdgeKey::new(3, 1), EdgeKey::new(1, 3), EdgeKey::new(2, 1)],
        0.2,
    );
    let snapshot = table.snapshot();
    assert_eq!(table.len(), 2);
    assert_eq!(
        snapshot,
        vec![(EdgeKey::new(1, 2), 0.2), (EdgeKey::new(1, 3), 0.2)]
    );
}

#[test]
fn unknown_edge_on_get() {
    let (table, _) = single_edge(0.2);
    assert!(matches!(
        table.get(&EdgeKey::new(4, 5)),
        Err(AntRouteError::UnknownEdge(k)) if k == EdgeKey::new(5, 4)
    ));
}

/// Keep `key` locked from another thread until the returned sender is dropped.
fn hold_entry(
    table: &Arc<PheromoneTable>,
    key: EdgeKey,
) -> (mpsc::Sender<()>, thread::JoinHandle<()>) {
    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let table = Arc::clone(table);
    let handle = thread::spawn(move || {
        table
            .update(&key, |_| {
                locked_tx.send(()).unwrap();
                let _ = release_rx.recv();
            })
            .unwrap();
    });
    locked_rx.recv().unwrap();
    (release_tx, handle)
}

#[test]
fn held_entry_does_not_stop_other_edges_decaying() {
    let stuck = EdgeKey::new(1, 2);
    let free = EdgeKey::new(5, 6);
    let table = Arc::new(
        PheromoneTable::new([stuck, free], 0.5).with_lock_timeout(Duration::from_millis(20)),
    );
    let (release, holder) = hold_entry(&table, stuck);

    let err = table.decay_all(0.5).unwrap_err();
    assert!(matches!(err, AntRouteError::LockTimeout { edge, .. } if edge == stuck));
    assert_eq!(table.get(&free).unwrap(), 0.25);

    drop(release);
    holder.join().unwrap();
    assert_eq!(table.get(&stuck).unwrap(), 0.5);
}

#[test]
fn several_held_entries_share_one_wait() {
    let keys: Vec<EdgeKey> = (1..=6).map(|v| EdgeKey::new(v, v + 10)).collect();
    let table = Arc::new(
        PheromoneTable::new(keys.clone(), 0.5).with_lock_timeout(Duration::from_millis(100)),
    );
    let held: Vec<_> = keys[..4].iter().map(|k| hold_entry(&table, *k)).collect();

    let started = Instant::now();
    assert!(table.decay_all(0.5).is_err());
    // One budget for the pass, not one per held entry.
    let elapsed = started.elapsed();
    assert!(elapsed < Duration::from_millis(350), "took {:?}", elapsed);
    for key in &keys[4..] {
        assert_eq!(table.get(key).unwrap(), 0.25);
    }

    for (release, holder) in held {
        drop(release);
        holder.join().unwrap();
    }
}
