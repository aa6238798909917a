//! Event capture for scape runs.
//!
//! A `tracing` subscriber turns every info-level event into one row of a
//! table named after the event's `target`. Columns appear the first time a
//! field is seen; rows that lack a field get a zero/empty filler.
//!
//! ```ignore
//! // in simulation code
//! tracing::info!(target: "trade", turn, buyer_id, seller_id, price);
//!
//! // in a test
//! let tables = tracing::subscriber::with_default(instrument::EventCollector, || {
//!     scape.simulate(10, &mut rng).unwrap();
//!     instrument::take()
//! });
//! let trades = tables.get("trade");
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

/// One typed column.
#[derive(Debug, Clone, PartialEq)]
pub enum EventColumn {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl EventColumn {
    pub fn len(&self) -> usize {
        match self {
            EventColumn::U64(v) => v.len(),
            EventColumn::I64(v) => v.len(),
            EventColumn::F64(v) => v.len(),
            EventColumn::Bool(v) => v.len(),
            EventColumn::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append fillers until the column holds `rows` values.
    fn fill_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        if missing == 0 {
            return;
        }
        match self {
            EventColumn::U64(v) => v.extend(std::iter::repeat_n(0, missing)),
            EventColumn::I64(v) => v.extend(std::iter::repeat_n(0, missing)),
            EventColumn::F64(v) => v.extend(std::iter::repeat_n(0.0, missing)),
            EventColumn::Bool(v) => v.extend(std::iter::repeat_n(false, missing)),
            EventColumn::Str(v) => v.extend(std::iter::repeat_n(String::new(), missing)),
        }
    }

    fn to_polars(&self, name: &str) -> Column {
        match self {
            EventColumn::U64(v) => Column::new(name.into(), v),
            EventColumn::I64(v) => Column::new(name.into(), v),
            EventColumn::F64(v) => Column::new(name.into(), v),
            EventColumn::Bool(v) => Column::new(name.into(), v),
            EventColumn::Str(v) => Column::new(name.into(), v),
        }
    }
}

/// Rows of one event target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    columns: BTreeMap<String, EventColumn>,
    rows: usize,
}

impl EventTable {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column(&self, name: &str) -> Option<&EventColumn> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn u64s(&self, name: &str) -> Option<&[u64]> {
        match self.columns.get(name)? {
            EventColumn::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn f64s(&self, name: &str) -> Option<&[f64]> {
        match self.columns.get(name)? {
            EventColumn::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn strs(&self, name: &str) -> Option<&[String]> {
        match self.columns.get(name)? {
            EventColumn::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Sum of a numeric column, whatever its integer/float type.
    pub fn sum(&self, name: &str) -> f64 {
        match self.columns.get(name) {
            Some(EventColumn::U64(v)) => v.iter().map(|&x| x as f64).sum(),
            Some(EventColumn::I64(v)) => v.iter().map(|&x| x as f64).sum(),
            Some(EventColumn::F64(v)) => v.iter().sum(),
            _ => 0.0,
        }
    }

    /// Record one event as a new row.
    fn push_event(&mut self, event: &Event<'_>) {
        event.record(&mut RowVisitor {
            table: self,
        });
        self.rows += 1;
        for column in self.columns.values_mut() {
            column.fill_to(self.rows);
        }
    }

    /// Column for `field`, created (back-filled) if this is its first value.
    fn column_for(&mut self, field: &Field, empty: fn() -> EventColumn) -> &mut EventColumn {
        let rows = self.rows;
        self.columns.entry(field.name().to_string()).or_insert_with(|| {
            let mut column = empty();
            column.fill_to(rows);
            column
        })
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        DataFrame::new(
            self.columns
                .iter()
                .map(|(name, column)| column.to_polars(name))
                .collect(),
        )
    }
}

/// All tables captured on this thread, keyed by target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTables {
    tables: BTreeMap<String, EventTable>,
}

impl EventTables {
    pub fn get(&self, target: &str) -> Option<&EventTable> {
        self.tables.get(target)
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Row count for a target; 0 if it never fired.
    pub fn rows(&self, target: &str) -> usize {
        self.tables.get(target).map_or(0, EventTable::rows)
    }

    /// Convert every table; tables polars rejects are skipped.
    pub fn to_dataframes(&self) -> BTreeMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}

thread_local! {
    static CAPTURED: RefCell<EventTables> = RefCell::default();
}

struct RowVisitor<'a> {
    table: &'a mut EventTable,
}

impl Visit for RowVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if let EventColumn::U64(v) = self.table.column_for(field, || EventColumn::U64(Vec::new())) {
            v.push(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let EventColumn::I64(v) = self.table.column_for(field, || EventColumn::I64(Vec::new())) {
            v.push(value);
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let EventColumn::F64(v) = self.table.column_for(field, || EventColumn::F64(Vec::new())) {
            v.push(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if let EventColumn::Bool(v) = self.table.column_for(field, || EventColumn::Bool(Vec::new())) {
            v.push(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if let EventColumn::Str(v) = self.table.column_for(field, || EventColumn::Str(Vec::new())) {
            v.push(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }
}

/// Subscriber that appends info-level (and more severe) events to the
/// thread-local tables. Spans are ignored.
pub struct EventCollector;

impl Subscriber for EventCollector {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let target = event.metadata().target().to_string();
        CAPTURED.with(|c| {
            c.borrow_mut()
                .tables
                .entry(target)
                .or_default()
                .push_event(event);
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Make `EventCollector` the global default. Later calls are ignored.
pub fn install() {
    let _ = tracing::subscriber::set_global_default(EventCollector);
}

/// Take everything captured on this thread so far.
pub fn take() -> EventTables {
    CAPTURED.with(|c| std::mem::take(&mut *c.borrow_mut()))
}

/// Discard everything captured on this thread.
pub fn reset() {
    CAPTURED.with(|c| *c.borrow_mut() = EventTables::default());
}

fn io_err(e: std::io::Error) -> PolarsError {
    PolarsError::IO {
        error: e.into(),
        msg: None,
    }
}

/// Write `{dir}/{target}.parquet` for every frame.
pub fn write_parquet(frames: &mut BTreeMap<String, DataFrame>, dir: &Path) -> PolarsResult<()> {
    std::fs::create_dir_all(dir).map_err(io_err)?;
    for (name, df) in frames.iter_mut() {
        let file = std::fs::File::create(dir.join(format!("{name}.parquet"))).map_err(io_err)?;
        ParquetWriter::new(file).finish(df)?;
    }
    Ok(())
}

fn dir_safe(name: &str) -> String {
    name.chars()
        .take(60)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Captures one run and persists it as parquet when dropped.
///
/// Creating a recorder resets the thread's tables and installs the global
/// collector. Output goes to `{parent}/{name}_{unix_seconds}/`, finished
/// by an empty `_ready` file.
pub struct RunRecorder {
    run_dir: PathBuf,
    frames: Option<BTreeMap<String, DataFrame>>,
}

impl RunRecorder {
    pub fn new(parent: impl Into<PathBuf>, name: &str) -> Self {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let run_dir = parent.into().join(format!("{}_{stamp}", dir_safe(name)));
        reset();
        install();
        Self { run_dir, frames: None }
    }

    /// Frames captured so far. The first call drains the thread's tables;
    /// later calls return the same frames.
    pub fn frames(&mut self) -> &BTreeMap<String, DataFrame> {
        self.frames.get_or_insert_with(|| take().to_dataframes())
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

impl Drop for RunRecorder {
    fn drop(&mut self) {
        let mut frames = self.frames.take().unwrap_or_else(|| take().to_dataframes());
        if frames.is_empty() {
            return;
        }
        if let Err(e) = write_parquet(&mut frames, &self.run_dir) {
            eprintln!("RunRecorder: failed to write {}: {e}", self.run_dir.display());
            return;
        }
        if let Err(e) = std::fs::File::create(self.run_dir.join("_ready")) {
            eprintln!("RunRecorder: failed to mark {} ready: {e}", self.run_dir.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::subscriber::with_default;

    #[test]
    fn test_rows_grouped_by_target() {
        reset();
        with_default(EventCollector, || {
            tracing::info!(target: "harvest", turn = 0u64, amount = 2.5f64);
            tracing::info!(target: "trade", turn = 0u64, price = 1.0f64);
            tracing::info!(target: "harvest", turn = 1u64, amount = 4.0f64);
            tracing::debug!(target: "harvest", turn = 2u64, amount = 9.0f64);
        });
        let tables = take();

        assert_eq!(tables.targets().collect::<Vec<_>>(), vec!["harvest", "trade"]);
        let harvest = tables.get("harvest").unwrap();
        assert_eq!(harvest.rows(), 2);
        assert_eq!(harvest.u64s("turn"), Some(&[0, 1][..]));
        assert_eq!(harvest.sum("amount"), 6.5);
        assert_eq!(tables.rows("death"), 0);
    }

    #[test]
    fn test_missing_fields_are_filled() {
        reset();
        with_default(EventCollector, || {
            tracing::info!(target: "birth", turn = 1u64, cause = "first");
            tracing::info!(target: "birth", turn = 2u64, x = 3u64);
            tracing::info!(target: "birth", turn = 3u64, cause = "third");
        });
        let tables = take();
        let births = tables.get("birth").unwrap();

        assert_eq!(births.rows(), 3);
        for name in births.column_names() {
            assert_eq!(births.column(name).unwrap().len(), 3, "{name} misaligned");
        }
        assert_eq!(births.strs("cause").unwrap(), &["first", "", "third"]);
        assert_eq!(births.u64s("x").unwrap(), &[0, 3, 0]);
    }

    #[test]
    fn test_take_leaves_nothing_behind() {
        reset();
        with_default(EventCollector, || {
            tracing::info!(target: "turn", turn = 0u64);
        });
        assert!(!take().is_empty());
        assert!(take().is_empty());
    }

    #[test]
    fn test_dataframe_shape() {
        reset();
        with_default(EventCollector, || {
            for turn in 0..4u64 {
                tracing::info!(target: "turn", turn = turn, living = 10u64 - turn, sugar = 1.5f64);
            }
        });
        let frames = take().to_dataframes();
        let df = &frames["turn"];
        assert_eq!(df.height(), 4);
        assert_eq!(df.width(), 3);
    }
}
