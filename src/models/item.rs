//! Items extracted from grid nodes, before they are flattened into rows.
//!
//! A [`SingleItem`] always renders as exactly one row. A [`CompositeItem`]
//! is one catalog entry that stands for several purchasable variants: some
//! of its fields hold equal-length lists which are unzipped into one row per
//! variant while scalar fields are repeated on every row.

use std::fmt::Display;

use tracing::{debug, warn};

use super::{Cell, Field, Record, Table};
use crate::error::ShopError;

/// Runs `extract` and returns its value, or `default` when it fails.
///
/// Site scrapers use this to declare one extraction recipe per field without
/// handling missing markup at every call site.
pub fn try_extract_or_default<T, E: Display>(
    field: &str,
    extract: impl FnOnce() -> Result<T, E>,
    default: T,
) -> T {
    match extract() {
        Ok(value) => value,
        Err(e) => {
            debug!(field, error = %e, "extraction failed, using default");
            default
        }
    }
}

/// An item that maps to one row.
#[derive(Debug, Clone, Default)]
pub struct SingleItem {
    record: Record,
}

impl SingleItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: Field, value: impl Into<Cell>) {
        self.record.set(field, value.into());
    }

    /// Evaluates `extract`; on failure the field keeps its schema default.
    pub fn set_with<C: Into<Cell>>(
        &mut self,
        field: Field,
        extract: impl FnOnce() -> anyhow::Result<C>,
    ) {
        let cell = try_extract_or_default(
            field.name(),
            || extract().map(Into::into),
            field.default_cell(),
        );
        self.record.set(field, cell);
    }

    /// Stores a site-specific field. Canonical names are routed to their column.
    pub fn set_extra(&mut self, name: &str, value: impl Into<Cell>) {
        let value = value.into();
        match Field::from_name(name) {
            Some(field) => self.record.set(field, value),
            None => {
                self.record.others.insert(name.to_string(), value.to_json());
            }
        }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn to_rows(&self) -> Table {
        Table::single(self.record.clone())
    }
}

/// Where a list-valued field lands once unzipped.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Field(Field),
    Extra(String),
}

impl Slot {
    fn for_name(name: &str) -> Self {
        Field::from_name(name).map_or_else(|| Slot::Extra(name.to_string()), Slot::Field)
    }

    fn name(&self) -> &str {
        match self {
            Slot::Field(field) => field.name(),
            Slot::Extra(name) => name,
        }
    }
}

/// An item whose list-valued fields expand into one row per variant.
#[derive(Debug, Clone, Default)]
pub struct CompositeItem {
    record: Record,
    lists: Vec<(Slot, Vec<Cell>)>,
}

impl CompositeItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: Field, value: impl Into<Cell>) {
        self.drop_list(&Slot::Field(field));
        self.record.set(field, value.into());
    }

    pub fn set_with<C: Into<Cell>>(
        &mut self,
        field: Field,
        extract: impl FnOnce() -> anyhow::Result<C>,
    ) {
        let cell = try_extract_or_default(
            field.name(),
            || extract().map(Into::into),
            field.default_cell(),
        );
        self.set(field, cell);
    }

    pub fn set_list<C: Into<Cell>>(&mut self, field: Field, values: Vec<C>) {
        self.put_list(Slot::Field(field), values);
    }

    /// Like [`set_with`](Self::set_with) for a list; a failed extraction
    /// leaves the scalar schema default in place of the list.
    pub fn set_list_with<C: Into<Cell>>(
        &mut self,
        field: Field,
        extract: impl FnOnce() -> anyhow::Result<Vec<C>>,
    ) {
        match extract() {
            Ok(values) => self.set_list(field, values),
            Err(e) => {
                debug!(field = field.name(), error = %e, "list extraction failed, using default");
                self.set(field, field.default_cell());
            }
        }
    }

    pub fn set_extra(&mut self, name: &str, value: impl Into<Cell>) {
        let slot = Slot::for_name(name);
        self.drop_list(&slot);
        let value = value.into();
        match slot {
            Slot::Field(field) => self.record.set(field, value),
            Slot::Extra(name) => {
                self.record.others.insert(name, value.to_json());
            }
        }
    }

    pub fn set_extra_list<C: Into<Cell>>(&mut self, name: &str, values: Vec<C>) {
        self.put_list(Slot::for_name(name), values);
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Unzips list fields into rows; mismatched lengths yield one error row
    /// carrying the raw payload.
    pub fn to_rows(&self) -> Table {
        match self.expand() {
            Ok(rows) => Table::new(rows),
            Err(e) => {
                warn!(error = %e, title = ?self.record.title, "composite item degraded to error row");
                Table::single(Record::error_row(e, self.record.raw.clone()))
            }
        }
    }

    fn expand(&self) -> Result<Vec<Record>, ShopError> {
        let Some((_, first)) = self.lists.first() else {
            return Ok(vec![self.record.clone()]);
        };
        let length = first.len();
        if self.lists.iter().any(|(_, values)| values.len() != length) {
            return Err(ShopError::ListLengthMismatch {
                lengths: self
                    .lists
                    .iter()
                    .map(|(slot, values)| (slot.name().to_string(), values.len()))
                    .collect(),
            });
        }

        let rows = (0..length)
            .map(|i| {
                let mut row = self.record.clone();
                for (slot, values) in &self.lists {
                    match slot {
                        Slot::Field(field) => row.set(*field, values[i].clone()),
                        Slot::Extra(name) => {
                            row.others.insert(name.clone(), values[i].to_json());
                        }
                    }
                }
                row
            })
            .collect();
        Ok(rows)
    }

    fn put_list<C: Into<Cell>>(&mut self, slot: Slot, values: Vec<C>) {
        let values = values.into_iter().map(Into::into).collect();
        if let Slot::Extra(name) = &slot {
            self.record.others.remove(name);
        }
        match self.lists.iter_mut().find(|(s, _)| *s == slot) {
            Some((_, existing)) => *existing = values,
            None => self.lists.push((slot, values)),
        }
    }

    fn drop_list(&mut self, slot: &Slot) {
        self.lists.retain(|(s, _)| s != slot);
    }
}

/// One scraped grid entry.
#[derive(Debug, Clone)]
pub enum Item {
    Single(SingleItem),
    Composite(CompositeItem),
}

impl Item {
    pub fn record(&self) -> &Record {
        match self {
            Item::Single(item) => item.record(),
            Item::Composite(item) => item.record(),
        }
    }

    pub fn set_raw(&mut self, raw: String) {
        match self {
            Item::Single(item) => item.record.raw = Some(raw),
            Item::Composite(item) => item.record.raw = Some(raw),
        }
    }

    /// Flattens the item into schema rows. Never fails: problems become an
    /// error row.
    pub fn to_rows(&self) -> Table {
        match self {
            Item::Single(item) => item.to_rows(),
            Item::Composite(item) => item.to_rows(),
        }
    }
}

impl From<SingleItem> for Item {
    fn from(item: SingleItem) -> Self {
        Item::Single(item)
    }
}

impl From<CompositeItem> for Item {
    fn from(item: CompositeItem) -> Self {
        Item::Composite(item)
    }
}
