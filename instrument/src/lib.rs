//! Column-oriented capture of market diagnostics.
//!
//! A `tracing` subscriber that turns every info-or-higher event into a row of a
//! table named after the event's target. Columns appear the first time a field
//! is seen; rows that lack a column get a zero/empty value there.
//!
//! # Usage
//!
//! ```ignore
//! // In market code:
//! tracing::info!(target: "market_update", day, city, good = good.name(), price);
//!
//! // In a test:
//! instrument::install_subscriber();
//! instrument::clear();
//! world.advance_day();
//! let recorder = instrument::drain();
//! let prices = recorder.table("market_update").unwrap().u64s("price");
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;

use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

// === Columns ===

#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

/// One recorded field value
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Str(String),
}

impl Values {
    fn empty_like(cell: &Cell, rows: usize) -> Self {
        match cell {
            Cell::U64(_) => Values::U64(vec![0; rows]),
            Cell::I64(_) => Values::I64(vec![0; rows]),
            Cell::F64(_) => Values::F64(vec![0.0; rows]),
            Cell::Bool(_) => Values::Bool(vec![false; rows]),
            Cell::Str(_) => Values::Str(vec![String::new(); rows]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Values::U64(v) => v.len(),
            Values::I64(v) => v.len(),
            Values::F64(v) => v.len(),
            Values::Bool(v) => v.len(),
            Values::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `cell`, or a blank when the field was missing or of another type
    fn push(&mut self, cell: Option<Cell>) {
        match (self, cell) {
            (Values::U64(v), Some(Cell::U64(x))) => v.push(x),
            (Values::I64(v), Some(Cell::I64(x))) => v.push(x),
            (Values::F64(v), Some(Cell::F64(x))) => v.push(x),
            (Values::Bool(v), Some(Cell::Bool(x))) => v.push(x),
            (Values::Str(v), Some(Cell::Str(x))) => v.push(x),
            (Values::U64(v), _) => v.push(0),
            (Values::I64(v), _) => v.push(0),
            (Values::F64(v), _) => v.push(0.0),
            (Values::Bool(v), _) => v.push(false),
            (Values::Str(v), _) => v.push(String::new()),
        }
    }

    fn to_column(&self, name: &str) -> Column {
        match self {
            Values::U64(v) => Column::new(name.into(), v),
            Values::I64(v) => Column::new(name.into(), v),
            Values::F64(v) => Column::new(name.into(), v),
            Values::Bool(v) => Column::new(name.into(), v),
            Values::Str(v) => Column::new(name.into(), v),
        }
    }
}

// === Tables ===

/// All events recorded under one target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: BTreeMap<String, Values>,
    rows: usize,
}

impl Table {
    fn push_row(&mut self, mut row: BTreeMap<String, Cell>) {
        for (name, cell) in &row {
            if !self.columns.contains_key(name) {
                self.columns
                    .insert(name.clone(), Values::empty_like(cell, self.rows));
            }
        }
        for (name, values) in self.columns.iter_mut() {
            values.push(row.remove(name));
        }
        self.rows += 1;
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column(&self, name: &str) -> Option<&Values> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Unsigned integer column; empty if absent or of another type
    pub fn u64s(&self, name: &str) -> &[u64] {
        match self.columns.get(name) {
            Some(Values::U64(v)) => v,
            _ => &[],
        }
    }

    pub fn f64s(&self, name: &str) -> &[f64] {
        match self.columns.get(name) {
            Some(Values::F64(v)) => v,
            _ => &[],
        }
    }

    pub fn strs(&self, name: &str) -> &[String] {
        match self.columns.get(name) {
            Some(Values::Str(v)) => v,
            _ => &[],
        }
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        DataFrame::new(
            self.columns
                .iter()
                .map(|(name, values)| values.to_column(name))
                .collect(),
        )
    }
}

/// Tables keyed by tracing target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recorder {
    tables: BTreeMap<String, Table>,
}

impl Recorder {
    pub fn table(&self, target: &str) -> Option<&Table> {
        self.tables.get(target)
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Row count for `target`, zero when nothing was recorded there
    pub fn rows(&self, target: &str) -> usize {
        self.table(target).map_or(0, Table::len)
    }

    pub fn to_dataframes(&self) -> PolarsResult<BTreeMap<String, DataFrame>> {
        self.tables
            .iter()
            .map(|(name, table)| Ok((name.clone(), table.to_dataframe()?)))
            .collect()
    }
}

thread_local! {
    static RECORDER: RefCell<Recorder> = RefCell::default();
}

// === Subscriber ===

#[derive(Default)]
struct RowVisitor {
    row: BTreeMap<String, Cell>,
}

impl RowVisitor {
    fn set(&mut self, field: &Field, cell: Cell) {
        self.row.insert(field.name().to_string(), cell);
    }
}

impl Visit for RowVisitor {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.set(field, Cell::U64(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.set(field, Cell::I64(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.set(field, Cell::F64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.set(field, Cell::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.set(field, Cell::Str(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.set(field, Cell::Str(format!("{value:?}")));
    }
}

/// Records events into the current thread's `Recorder`. Spans are ignored.
pub struct TableSubscriber;

impl Subscriber for TableSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let mut visitor = RowVisitor::default();
        event.record(&mut visitor);
        let target = event.metadata().target().to_string();

        RECORDER.with(|r| {
            r.borrow_mut()
                .tables
                .entry(target)
                .or_default()
                .push_row(visitor.row);
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install `TableSubscriber` as the global default. Later calls are no-ops, so
/// every test can call this.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(TableSubscriber);
}

/// Take everything recorded on this thread so far
pub fn drain() -> Recorder {
    RECORDER.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

pub fn clear() {
    RECORDER.with(|r| *r.borrow_mut() = Recorder::default());
}
