use chrono::NaiveDate;
use nseries_domain::{LineKey, Series, SeriesLine, SeriesRelationship};
use nseries_store::*;
use std::sync::{Barrier, mpsc};
use std::thread;
use std::time::Duration;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_store() -> MemoryStore {
    MemoryStore::builder()
        .series(Series::new("SALES", "Sales invoices"))
        .series(Series::new("WEB", "Web orders"))
        .line(SeriesLine::new("SALES", 20000, Some(date(2024, 1, 1)), "S24-0001"))
        .line(SeriesLine::new("SALES", 10000, Some(date(2023, 1, 1)), "S23-0001"))
        .line(SeriesLine::new("SALES", 30000, None, "S00001"))
        .relationship(SeriesRelationship::new("SALES", "WEB"))
        .build()
        .unwrap()
}

#[test]
fn test_lines_ordered_by_starting_date_then_line_no() {
    let store = sample_store();
    let lines = store.lines("SALES").unwrap();

    let order: Vec<u32> = lines.iter().map(|l| l.line_no).collect();
    assert_eq!(order, vec![30000, 10000, 20000]);
    assert!(store.lines("WEB").unwrap().is_empty());
}

#[test]
fn test_unknown_series_and_line() {
    let store = sample_store();

    assert!(matches!(store.series("NOPE"), Err(StoreError::SeriesNotFound { .. })));
    assert!(matches!(store.lines("NOPE"), Err(StoreError::SeriesNotFound { .. })));
    assert!(matches!(
        store.line(&LineKey::new("SALES", 1)),
        Err(StoreError::LineNotFound { .. })
    ));
}

#[test]
fn test_related_lists_configured_stand_ins() {
    let store = sample_store();

    let related = store.related("SALES").unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0], "WEB");
    assert!(store.related("WEB").unwrap().is_empty());
}

#[test]
fn test_builder_rejects_invalid_catalog() {
    let dup = MemoryStore::builder()
        .series(Series::new("A", ""))
        .series(Series::new("A", ""))
        .build();
    assert!(matches!(dup, Err(StoreError::InvalidCatalog { .. })));

    let orphan = MemoryStore::builder().line(SeriesLine::new("A", 1, None, "1")).build();
    assert!(matches!(orphan, Err(StoreError::SeriesNotFound { .. })));

    let zero = MemoryStore::builder()
        .series(Series::new("A", ""))
        .line(SeriesLine::new("A", 1, None, "1").with_increment(0))
        .build();
    assert!(matches!(zero, Err(StoreError::InvalidCatalog { .. })));

    let dup_line = MemoryStore::builder()
        .series(Series::new("A", ""))
        .line(SeriesLine::new("A", 1, None, "1"))
        .line(SeriesLine::new("A", 1, None, "2"))
        .build();
    assert!(matches!(dup_line, Err(StoreError::InvalidCatalog { .. })));

    let bad_rel = MemoryStore::builder()
        .series(Series::new("A", ""))
        .relationship(SeriesRelationship::new("A", "B"))
        .build();
    assert!(matches!(bad_rel, Err(StoreError::SeriesNotFound { .. })));
}

#[test]
fn test_commit_publishes_allocation_fields_only() {
    let store = sample_store();
    let key = LineKey::new("SALES", 10000);

    let mut tx = store.begin();
    let mut row = store.lock_line(&mut tx, &key).unwrap();
    row.last_no_used = Some("S23-0001".to_owned());
    row.last_date_used = Some(date(2023, 3, 1));
    row.starting_no = "HIJACKED".to_owned();
    store.stage_line(&mut tx, row).unwrap();

    // Readers outside the transaction still see the committed row.
    assert_eq!(store.line(&key).unwrap().last_no_used, None);
    tx.commit().unwrap();

    let committed = store.line(&key).unwrap();
    assert_eq!(committed.last_no_used.as_deref(), Some("S23-0001"));
    assert_eq!(committed.last_date_used, Some(date(2023, 3, 1)));
    assert_eq!(committed.starting_no, "S23-0001");
    assert_eq!(store.held_locks(), 0);
}

#[test]
fn test_rollback_and_drop_discard_staged_rows() {
    let store = sample_store();
    let key = LineKey::new("SALES", 10000);

    let mut tx = store.begin();
    let mut row = store.lock_line(&mut tx, &key).unwrap();
    row.last_no_used = Some("S23-0001".to_owned());
    store.stage_line(&mut tx, row.clone()).unwrap();
    tx.rollback();
    assert_eq!(store.line(&key).unwrap().last_no_used, None);

    {
        let mut tx = store.begin();
        store.lock_line(&mut tx, &key).unwrap();
        store.stage_line(&mut tx, row).unwrap();
        assert_eq!(store.held_locks(), 1);
    }
    assert_eq!(store.line(&key).unwrap().last_no_used, None);
    assert_eq!(store.held_locks(), 0);
}

#[test]
fn test_lock_line_sees_own_staged_write() {
    let store = sample_store();
    let key = LineKey::new("SALES", 20000);

    let mut tx = store.begin();
    let mut row = store.lock_line(&mut tx, &key).unwrap();
    row.last_no_used = Some("S24-0001".to_owned());
    store.stage_line(&mut tx, row).unwrap();

    let again = store.lock_line(&mut tx, &key).unwrap();
    assert_eq!(again.last_no_used.as_deref(), Some("S24-0001"));
    assert!(tx.holds(&key));
    assert_eq!(tx.staged(), 1);
}

#[test]
fn test_stage_without_lock_is_rejected() {
    let store = sample_store();
    let row = store.line(&LineKey::new("SALES", 10000)).unwrap();

    let mut tx = store.begin();
    assert!(matches!(store.stage_line(&mut tx, row), Err(StoreError::LockNotHeld { .. })));
}

#[test]
fn test_foreign_transaction_is_rejected() {
    let store = sample_store();
    let other = sample_store();
    let key = LineKey::new("SALES", 10000);

    let mut tx = other.begin();
    assert!(matches!(store.lock_line(&mut tx, &key), Err(StoreError::Internal { .. })));
}

#[test]
fn test_row_lock_blocks_until_holder_ends() {
    let store = sample_store();
    let key = LineKey::new("SALES", 10000);

    let mut holder = store.begin();
    let mut row = store.lock_line(&mut holder, &key).unwrap();
    row.last_no_used = Some("S23-0001".to_owned());
    store.stage_line(&mut holder, row).unwrap();

    let (sent, received) = mpsc::channel();
    thread::scope(|s| {
        let store = store.clone();
        let key = key.clone();
        s.spawn(move || {
            let mut waiter = store.begin();
            let seen = store.lock_line(&mut waiter, &key).unwrap();
            sent.send(seen.last_no_used).unwrap();
            waiter.rollback();
        });

        // The waiter must not get through while the holder is open.
        assert!(received.recv_timeout(Duration::from_millis(100)).is_err());
        holder.commit().unwrap();

        let seen = received.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(seen.as_deref(), Some("S23-0001"));
    });
    assert_eq!(store.held_locks(), 0);
}

#[test]
fn test_crossed_row_locks_refuse_one_waiter() {
    let store = sample_store();
    let first = LineKey::new("SALES", 10000);
    let second = LineKey::new("SALES", 30000);
    let barrier = Barrier::new(2);

    let (sent, received) = mpsc::channel();
    thread::scope(|s| {
        for (a, b) in [(&first, &second), (&second, &first)] {
            let (store, barrier, sent) = (store.clone(), &barrier, sent.clone());
            s.spawn(move || {
                let mut tx = store.begin();
                store.lock_line(&mut tx, a).unwrap();
                barrier.wait();
                match store.lock_line(&mut tx, b) {
                    Ok(_) => {
                        tx.commit().unwrap();
                        sent.send(true).unwrap();
                    },
                    Err(err) => {
                        assert!(matches!(err, StoreError::Deadlock { .. }), "{err}");
                        tx.rollback();
                        sent.send(false).unwrap();
                    },
                }
            });
        }

        let mut outcomes = [
            received.recv_timeout(Duration::from_secs(5)).unwrap(),
            received.recv_timeout(Duration::from_secs(5)).unwrap(),
        ];
        outcomes.sort_unstable();
        assert_eq!(outcomes, [false, true]);
    });
    assert_eq!(store.held_locks(), 0);
}

#[test]
fn test_configuration_edits() {
    let store = sample_store();
    let key = LineKey::new("SALES", 30000);

    store.set_line_open(&key, false).unwrap();
    assert!(!store.line(&key).unwrap().open);

    store.upsert_series(Series::new("POS", "Point of sale"));
    store.upsert_line(SeriesLine::new("POS", 10000, None, "P001")).unwrap();
    assert_eq!(store.lines("POS").unwrap().len(), 1);
    assert!(store.upsert_line(SeriesLine::new("NOPE", 1, None, "1")).is_err());

    store.add_relationship(SeriesRelationship::new("SALES", "POS")).unwrap();
    store.add_relationship(SeriesRelationship::new("SALES", "POS")).unwrap();
    assert_eq!(store.related("SALES").unwrap().len(), 2);
}
