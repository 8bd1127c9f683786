use chrono::NaiveDate;
use nseries_domain::{Series, SeriesLine};
use nseries_numbering::*;
use nseries_store::{MemoryStore, Transaction};
use std::collections::BTreeSet;
use std::sync::{Barrier, mpsc};
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;
const PER_THREAD: usize = 25;

fn engine(line: SeriesLine) -> NoSeries<MemoryStore> {
    let store = MemoryStore::builder().series(Series::new("SALES", "")).line(line).build().unwrap();
    NoSeries::builder()
        .repository(store)
        .work_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        .build()
}

#[test]
fn test_gap_free_is_unique_and_contiguous_under_contention() {
    let engine = engine(SeriesLine::new("SALES", 10000, None, "S00001"));
    let barrier = Barrier::new(THREADS);

    let issued: Vec<String> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    (0..PER_THREAD)
                        .map(|_| {
                            let mut tx = engine.begin();
                            let number = engine.get_next_no(&mut tx, "SALES", None, false).unwrap();
                            tx.commit().unwrap();
                            number
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });

    let unique: BTreeSet<String> = issued.iter().cloned().collect();
    let expected: BTreeSet<String> = (1..=THREADS * PER_THREAD).map(|n| format!("S{n:05}")).collect();
    assert_eq!(unique, expected);
    assert_eq!(issued.len(), THREADS * PER_THREAD);
}

#[test]
fn test_gap_free_waits_for_holder_and_sees_its_rollback() {
    let engine = engine(SeriesLine::new("SALES", 10000, None, "S00001"));

    let mut holder = engine.begin();
    assert_eq!(engine.get_next_no(&mut holder, "SALES", None, false).unwrap(), "S00001");

    let (sent, received) = mpsc::channel();
    thread::scope(|s| {
        let waiter_engine = engine.clone();
        s.spawn(move || {
            let mut tx = waiter_engine.begin();
            let number = waiter_engine.get_next_no(&mut tx, "SALES", None, false).unwrap();
            tx.commit().unwrap();
            sent.send(number).unwrap();
        });

        assert!(received.recv_timeout(Duration::from_millis(100)).is_err());
        holder.rollback();
        assert_eq!(received.recv_timeout(Duration::from_secs(5)).unwrap(), "S00001");
    });
}

#[test]
fn test_peek_never_blocks_on_a_held_line() {
    let engine = engine(SeriesLine::new("SALES", 10000, None, "S00001"));

    let mut holder = engine.begin();
    engine.get_next_no(&mut holder, "SALES", None, false).unwrap();

    let (sent, received) = mpsc::channel();
    thread::scope(|s| {
        s.spawn(|| sent.send(engine.peek_next_no("SALES", None).unwrap()).unwrap());
        assert_eq!(received.recv_timeout(Duration::from_secs(5)).unwrap(), "S00001");
    });
    holder.commit().unwrap();
}

#[test]
fn test_gap_allowed_concurrent_callers_and_abort() {
    let engine = engine(SeriesLine::new("SALES", 10000, None, "G00001").with_gaps(true));
    let barrier = Barrier::new(2);

    let results: Vec<(String, bool)> = thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    let mut tx = engine.begin();
                    barrier.wait();
                    let number = engine.get_next_no(&mut tx, "SALES", None, false).unwrap();
                    // Both callers hold their numbers before either transaction ends.
                    barrier.wait();
                    let abort = number == "G00001";
                    if abort { tx.rollback() } else { tx.commit().unwrap() }
                    (number, abort)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let numbers: BTreeSet<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(numbers, BTreeSet::from(["G00001", "G00002"]));
    assert!(results.iter().any(|(_, aborted)| *aborted));

    let mut tx = engine.begin();
    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, false).unwrap(), "G00003");
}

#[test]
fn test_gap_allowed_is_unique_under_contention() {
    let engine = engine(SeriesLine::new("SALES", 10000, None, "G00001").with_gaps(true));
    let barrier = Barrier::new(THREADS);

    let issued: Vec<String> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let engine = &engine;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    let mut tx = engine.begin();
                    let numbers = (0..PER_THREAD)
                        .map(|_| engine.get_next_no(&mut tx, "SALES", None, false).unwrap())
                        .collect::<Vec<_>>();
                    // Every other caller aborts; its numbers stay consumed.
                    if i % 2 == 0 { tx.rollback() } else { tx.commit().unwrap() }
                    numbers
                })
            })
            .collect();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });

    let unique: BTreeSet<String> = issued.iter().cloned().collect();
    assert_eq!(unique.len(), THREADS * PER_THREAD);
    assert_eq!(
        engine.peek_next_no("SALES", None).unwrap(),
        format!("G{:05}", THREADS * PER_THREAD + 1)
    );
}

#[test]
fn test_crossed_gap_free_series_refuse_one_caller_for_retry() {
    let store = MemoryStore::builder()
        .series(Series::new("SALES", ""))
        .series(Series::new("PURCH", ""))
        .line(SeriesLine::new("SALES", 10000, None, "S00001"))
        .line(SeriesLine::new("PURCH", 10000, None, "P00001"))
        .build()
        .unwrap();
    let engine: NoSeries<MemoryStore> = NoSeries::builder()
        .repository(store)
        .work_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        .build();
    let barrier = Barrier::new(2);

    let outcomes: Vec<Option<ErrorKind>> = thread::scope(|s| {
        let handles: Vec<_> = [("SALES", "PURCH"), ("PURCH", "SALES")]
            .into_iter()
            .map(|(a, b)| {
                let (engine, barrier) = (&engine, &barrier);
                s.spawn(move || {
                    let mut tx = engine.begin();
                    engine.get_next_no(&mut tx, a, None, false).unwrap();
                    barrier.wait();
                    match engine.get_next_no(&mut tx, b, None, false) {
                        Ok(_) => {
                            tx.commit().unwrap();
                            None
                        },
                        Err(err) => {
                            tx.rollback();
                            Some(err.kind())
                        },
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let refused: Vec<_> = outcomes.iter().flatten().collect();
    assert_eq!(refused, vec![&ErrorKind::Conflict]);

    // The refused caller rolled back, so its retry continues right after the winner.
    let mut tx = engine.begin();
    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, false).unwrap(), "S00002");
    assert_eq!(engine.get_next_no(&mut tx, "PURCH", None, false).unwrap(), "P00002");
    tx.commit().unwrap();
}
