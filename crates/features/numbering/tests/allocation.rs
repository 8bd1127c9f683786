use chrono::NaiveDate;
use nseries_domain::{LineKey, Series, SeriesFlags, SeriesLine};
use nseries_numbering::*;
use nseries_store::{MemoryStore, Transaction};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn engine(store: MemoryStore) -> NoSeries<MemoryStore> {
    NoSeries::builder().repository(store).work_date(date(2024, 3, 1)).build()
}

fn sales(lines: impl IntoIterator<Item = SeriesLine>) -> NoSeries<MemoryStore> {
    let mut builder = MemoryStore::builder().series(Series::new("SALES", "Sales invoices"));
    for line in lines {
        builder = builder.line(line);
    }
    engine(builder.build().unwrap())
}

#[test]
fn test_gap_free_sequence_starts_at_starting_no() {
    let engine = sales([SeriesLine::new("SALES", 10000, Some(date(2024, 1, 1)), "S00001")]);

    let mut tx = engine.begin();
    assert_eq!(engine.get_next_no(&mut tx, "SALES", Some(date(2024, 3, 1)), false).unwrap(), "S00001");
    assert_eq!(engine.get_next_no(&mut tx, "SALES", Some(date(2024, 3, 1)), false).unwrap(), "S00002");
    tx.commit().unwrap();

    let line = engine.line(&LineKey::new("SALES", 10000)).unwrap();
    assert_eq!(line.last_no_used.as_deref(), Some("S00002"));
    assert_eq!(line.last_date_used, Some(date(2024, 3, 1)));
}

#[test]
fn test_later_line_wins_after_its_starting_date() {
    let engine = sales([
        SeriesLine::new("SALES", 10000, Some(date(2024, 1, 1)), "S00001"),
        SeriesLine::new("SALES", 20000, Some(date(2024, 6, 1)), "S00100"),
    ]);

    let mut tx = engine.begin();
    assert_eq!(engine.get_next_no(&mut tx, "SALES", Some(date(2024, 7, 1)), false).unwrap(), "S00100");
    assert_eq!(engine.get_next_no(&mut tx, "SALES", Some(date(2024, 5, 31)), false).unwrap(), "S00001");
    tx.commit().unwrap();

    let selected = engine.select_line("SALES", Some(date(2024, 7, 1)), false).unwrap().unwrap();
    assert_eq!(selected.line_no, 20000);
}

#[test]
fn test_usage_date_defaults_to_work_date() {
    let engine = sales([
        SeriesLine::new("SALES", 10000, Some(date(2024, 1, 1)), "A001"),
        SeriesLine::new("SALES", 20000, Some(date(2024, 6, 1)), "B001"),
    ]);

    assert_eq!(engine.work_date(), date(2024, 3, 1));
    assert_eq!(engine.peek_next_no("SALES", None).unwrap(), "A001");
}

#[test]
fn test_increment_by_steps() {
    let engine = sales([SeriesLine::new("SALES", 10000, None, "S00010").with_increment(10)]);

    let mut tx = engine.begin();
    let numbers: Vec<String> =
        (0..3).map(|_| engine.get_next_no(&mut tx, "SALES", None, false).unwrap()).collect();
    assert_eq!(numbers, vec!["S00010", "S00020", "S00030"]);
}

#[test]
fn test_peek_matches_next_allocation_and_writes_nothing() {
    let engine = sales([SeriesLine::new("SALES", 10000, None, "S00001")]);

    assert_eq!(engine.peek_next_no("SALES", None).unwrap(), "S00001");
    assert_eq!(engine.peek_next_no("SALES", None).unwrap(), "S00001");
    assert_eq!(engine.repository().held_locks(), 0);

    let mut tx = engine.begin();
    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, false).unwrap(), "S00001");
    tx.commit().unwrap();
    assert_eq!(engine.peek_next_no("SALES", None).unwrap(), "S00002");
}

#[test]
fn test_gap_free_rollback_gives_number_back() {
    let engine = sales([SeriesLine::new("SALES", 10000, None, "S00001")]);

    let mut tx = engine.begin();
    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, false).unwrap(), "S00001");
    tx.rollback();

    let mut tx = engine.begin();
    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, false).unwrap(), "S00001");
    tx.commit().unwrap();
}

#[test]
fn test_gap_allowed_rollback_leaves_a_hole() {
    let engine = sales([SeriesLine::new("SALES", 10000, None, "G00001").with_gaps(true)]);

    let mut first = engine.begin();
    let mut second = engine.begin();
    assert_eq!(engine.get_next_no(&mut first, "SALES", None, false).unwrap(), "G00001");
    assert_eq!(engine.get_next_no(&mut second, "SALES", None, false).unwrap(), "G00002");
    first.rollback();
    second.commit().unwrap();

    let mut third = engine.begin();
    assert_eq!(engine.get_next_no(&mut third, "SALES", None, false).unwrap(), "G00003");
    assert_eq!(engine.get_last_no_used("SALES", None).unwrap().as_deref(), Some("G00003"));
}

#[test]
fn test_gap_allowed_counter_continues_from_last_no_used() {
    let engine = sales([SeriesLine::new("SALES", 10000, None, "G00001")
        .with_gaps(true)
        .with_last_used("G00041", Some(date(2024, 2, 1)))]);

    assert_eq!(engine.peek_next_no("SALES", None).unwrap(), "G00042");
    let mut tx = engine.begin();
    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, false).unwrap(), "G00042");
}

#[test]
fn test_restart_sequence_reseeds_from_row() {
    let engine = sales([SeriesLine::new("SALES", 10000, None, "G00001").with_gaps(true)]);
    let key = LineKey::new("SALES", 10000);

    let mut tx = engine.begin();
    engine.get_next_no(&mut tx, "SALES", None, false).unwrap();

    engine
        .repository()
        .upsert_line(SeriesLine::new("SALES", 10000, None, "G00001").with_gaps(true).with_last_used("G00500", None))
        .unwrap();
    engine.restart_sequence(&key).unwrap();

    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, false).unwrap(), "G00501");
}

#[test]
fn test_exhausted_range() {
    let engine = sales([SeriesLine::new("SALES", 10000, None, "S01").with_ending_no("S02").with_warning_no("S02")]);

    let mut tx = engine.begin();
    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, false).unwrap(), "S01");
    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, false).unwrap(), "S02");

    let err = engine.get_next_no(&mut tx, "SALES", None, false).unwrap_err();
    assert!(matches!(err, NumberingError::RangeExhausted { .. }));
    assert_eq!(err.kind(), ErrorKind::Exhaustion);
    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, true).unwrap(), "");
    tx.commit().unwrap();

    assert!(matches!(engine.peek_next_no("SALES", None), Err(NumberingError::RangeExhausted { .. })));
}

#[test]
fn test_exhausted_gap_allowed_range_consumes_nothing() {
    let engine = sales([SeriesLine::new("SALES", 10000, None, "G01").with_ending_no("G02").with_gaps(true)]);

    let mut tx = engine.begin();
    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, false).unwrap(), "G01");
    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, false).unwrap(), "G02");
    for _ in 0..3 {
        let err = engine.get_next_no(&mut tx, "SALES", None, false).unwrap_err();
        assert!(matches!(err, NumberingError::RangeExhausted { ref next, .. } if next == "G03"));
        assert_eq!(err.kind(), ErrorKind::Exhaustion);
    }
    tx.commit().unwrap();

    assert_eq!(engine.get_last_no_used("SALES", None).unwrap().as_deref(), Some("G02"));
    assert!(matches!(engine.peek_next_no("SALES", None), Err(NumberingError::RangeExhausted { .. })));
}

#[test]
fn test_no_open_line() {
    let engine = sales([
        SeriesLine::new("SALES", 10000, Some(date(2024, 6, 1)), "S00001"),
        SeriesLine::new("SALES", 20000, Some(date(2024, 3, 1)), "X00001").with_open(false),
    ]);

    let mut tx = engine.begin();
    let err = engine.get_next_no(&mut tx, "SALES", Some(date(2024, 1, 1)), false).unwrap_err();
    assert!(matches!(err, NumberingError::NoOpenLine { on_date: None, .. }));

    let err = engine.get_next_no(&mut tx, "SALES", Some(date(2024, 3, 1)), false).unwrap_err();
    assert!(matches!(err, NumberingError::NoOpenLine { on_date: Some(_), .. }));
    assert!(err.to_string().contains("2024-03-01"));

    assert_eq!(engine.get_next_no(&mut tx, "SALES", Some(date(2024, 1, 1)), true).unwrap(), "");
    assert!(engine.select_line("SALES", Some(date(2024, 1, 1)), true).unwrap().is_none());
}

#[test]
fn test_date_order_enforced() {
    let store = MemoryStore::builder()
        .series(Series::new("SALES", "").with_flags(SeriesFlags::DEFAULT | SeriesFlags::DATE_ORDER))
        .line(SeriesLine::new("SALES", 10000, None, "S00001").with_last_used("S00005", Some(date(2024, 5, 1))))
        .build()
        .unwrap();
    let engine = engine(store);

    let mut tx = engine.begin();
    let err = engine.get_next_no(&mut tx, "SALES", Some(date(2024, 4, 1)), false).unwrap_err();
    assert!(matches!(err, NumberingError::OrderingViolation { .. }));
    assert_eq!(err.kind(), ErrorKind::OrderingViolation);
    assert_eq!(engine.get_next_no(&mut tx, "SALES", Some(date(2024, 4, 1)), true).unwrap(), "");

    assert_eq!(engine.get_next_no(&mut tx, "SALES", Some(date(2024, 5, 1)), false).unwrap(), "S00006");
}

#[test]
fn test_date_order_follows_gap_allowed_counter() {
    let store = MemoryStore::builder()
        .series(Series::new("WEB", "").with_flags(SeriesFlags::DEFAULT | SeriesFlags::DATE_ORDER))
        .line(SeriesLine::new("WEB", 10000, None, "W001").with_gaps(true))
        .build()
        .unwrap();
    let engine = engine(store);

    let mut tx = engine.begin();
    engine.get_next_no(&mut tx, "WEB", Some(date(2024, 5, 1)), false).unwrap();
    let err = engine.get_next_no(&mut tx, "WEB", Some(date(2024, 4, 1)), false).unwrap_err();
    assert!(matches!(err, NumberingError::OrderingViolation { .. }));

    // The refused call consumed nothing.
    assert_eq!(engine.get_next_no(&mut tx, "WEB", Some(date(2024, 5, 1)), false).unwrap(), "W002");
}

#[test]
fn test_configuration_errors_are_never_suppressed() {
    let engine = sales([SeriesLine::new("SALES", 10000, None, "NODIGITS")]);

    let mut tx = engine.begin();
    let err = engine.get_next_no(&mut tx, "NOPE", None, true).unwrap_err();
    assert!(matches!(err, NumberingError::SeriesNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = engine.get_next_no(&mut tx, "SALES", None, true).unwrap_err();
    assert!(matches!(err, NumberingError::InvalidNumber { .. }));
}

#[test]
fn test_get_next_no_for_specific_line() {
    let engine = sales([
        SeriesLine::new("SALES", 10000, Some(date(2024, 1, 1)), "A001"),
        SeriesLine::new("SALES", 20000, Some(date(2024, 2, 1)), "B001"),
    ]);

    let mut tx = engine.begin();
    let key = LineKey::new("SALES", 10000);
    assert_eq!(engine.get_next_no_for_line(&mut tx, &key, None, false).unwrap(), "A001");
    tx.commit().unwrap();
    assert_eq!(engine.last_no_used(&key).unwrap().as_deref(), Some("A001"));
    assert_eq!(engine.peek_next_no("SALES", None).unwrap(), "B001");
}

#[test]
fn test_last_no_used_and_gap_policy() {
    let engine = sales([
        SeriesLine::new("SALES", 10000, Some(date(2024, 1, 1)), "S001"),
        SeriesLine::new("SALES", 20000, Some(date(2024, 6, 1)), "G001").with_gaps(true),
    ]);

    assert_eq!(engine.get_last_no_used("SALES", None).unwrap(), None);
    assert!(!engine.may_produce_gaps("SALES", None).unwrap());
    assert!(engine.may_produce_gaps("SALES", Some(date(2024, 6, 1))).unwrap());

    let mut tx = engine.begin();
    engine.get_next_no(&mut tx, "SALES", None, false).unwrap();
    // Uncommitted gap-free numbers are invisible to readers.
    assert_eq!(engine.get_last_no_used("SALES", None).unwrap(), None);
    tx.commit().unwrap();
    assert_eq!(engine.get_last_no_used("SALES", None).unwrap().as_deref(), Some("S001"));
}

#[test]
fn test_verify_posting_order() {
    let engine = sales([SeriesLine::new("SALES", 10000, None, "S00001")]);

    engine.verify_posting_order("SALES", None, "S00001").unwrap();
    let err = engine.verify_posting_order("SALES", None, "S00002").unwrap_err();
    assert!(matches!(
        &err,
        NumberingError::PostingOrder { expected, actual, .. } if expected == "S00001" && actual == "S00002"
    ));
    assert_eq!(err.kind(), ErrorKind::PostingOrder);
}

#[test]
fn test_padding_widens_on_overflow() {
    let engine = sales([SeriesLine::new("SALES", 10000, None, "S98")]);

    let mut tx = engine.begin();
    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, false).unwrap(), "S98");
    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, false).unwrap(), "S99");
    assert_eq!(engine.get_next_no(&mut tx, "SALES", None, false).unwrap(), "S100");
}
