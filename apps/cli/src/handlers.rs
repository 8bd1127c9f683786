use crate::args::Target;
use anyhow::{Context, Result};
use nseries::{MemoryStore, NoSeries, Transaction};

pub(crate) type Engine = NoSeries<MemoryStore>;

pub(crate) fn next(engine: &Engine, target: &Target, count: usize, suppress: bool) -> Result<()> {
    let mut tx = engine.begin();
    let mut numbers = Vec::with_capacity(count);
    for _ in 0..count {
        let number = engine
            .get_next_no(&mut tx, &target.series, target.date, suppress)
            .with_context(|| format!("Failed to allocate from series '{}'", target.series))?;
        numbers.push(number);
    }
    tx.commit().context("Failed to commit allocation")?;
    numbers.iter().for_each(|number| println!("{number}"));
    Ok(())
}

pub(crate) fn batch(engine: &Engine, target: &Target, count: usize, simulate: bool) -> Result<()> {
    let mut batch = if simulate { engine.simulation() } else { engine.batch() };
    for _ in 0..count {
        println!("{}", batch.get_next_no(&target.series, target.date, false)?);
    }

    batch.commit_state(engine.begin()).context("Failed to save batch")?;
    Ok(())
}

pub(crate) fn peek(engine: &Engine, target: &Target) -> Result<()> {
    println!("{}", engine.peek_next_no(&target.series, target.date)?);
    Ok(())
}

pub(crate) fn last(engine: &Engine, target: &Target) -> Result<()> {
    let last = engine.get_last_no_used(&target.series, target.date)?;
    println!("{}", last.as_deref().unwrap_or("-"));
    Ok(())
}

pub(crate) fn lines(engine: &Engine, series: &str) -> Result<()> {
    for line in engine.lines(series)? {
        println!(
            "{:>6}  {:<10}  {:<12}  {:<12}  {:<12}  {}{}",
            line.line_no,
            line.starting_date.map_or_else(|| "-".to_owned(), |d| d.to_string()),
            line.starting_no,
            line.ending_no.as_deref().unwrap_or("-"),
            line.last_no_used.as_deref().unwrap_or("-"),
            if line.allow_gaps { "gaps" } else { "no-gaps" },
            if line.open { "" } else { " closed" },
        );
    }
    Ok(())
}

pub(crate) fn manual(engine: &Engine, series: &str, document: Option<&str>) -> Result<()> {
    match document {
        Some(document) => engine.allow_manual_entry_for(series, document)?,
        None => engine.allow_manual_entry(series)?,
    }
    println!("manual numbers allowed for {series}");
    Ok(())
}

pub(crate) fn related(engine: &Engine, series: &str) -> Result<()> {
    for candidate in engine.related_series(series)? {
        println!("{:<12}  {}", candidate.code, candidate.description);
    }
    Ok(())
}

pub(crate) fn verify(engine: &Engine, target: &Target, document: &str) -> Result<()> {
    engine.verify_posting_order(&target.series, target.date, document)?;
    println!("{document} is next in {}", target.series);
    Ok(())
}
