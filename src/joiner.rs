//! Left join of race records against racecourse coordinates.
//!
//! Every race comes out exactly once, in input order. A race whose course
//! has no coordinates keeps null derived columns; that is a normal outcome,
//! not an error.

use crate::config::JoinColumns;
use crate::models::{Coordinate, JoinStats, Table};
use crate::value::{Value, ValueKey};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Course name to `(x, y)` mapping, built once from all coordinates
#[derive(Debug, Default)]
pub struct CoordinateLookup {
    entries: HashMap<ValueKey, (Value, Value)>,
    duplicates: usize,
}

impl CoordinateLookup {
    /// Build the lookup in source order; a repeated name replaces the earlier entry
    ///
    /// Date-typed names are left out since no course can ever equal them.
    pub fn build(coords: &[Coordinate]) -> Self {
        let mut entries = HashMap::with_capacity(coords.len());
        let mut duplicates = 0;

        for coord in coords {
            let Some(key) = coord.name.key() else {
                debug!("Coordinate name '{}' is a date and can never match", coord.name);
                continue;
            };
            let previous = entries.insert(key, (coord.x.clone(), coord.y.clone()));
            if previous.is_some() {
                duplicates += 1;
                warn!(
                    "Duplicate coordinates for course '{}', using the later entry",
                    coord.name
                );
            }
        }

        debug!(
            "Built coordinate lookup: {} courses from {} rows",
            entries.len(),
            coords.len()
        );

        Self {
            entries,
            duplicates,
        }
    }

    pub fn get(&self, name: &Value) -> Option<&(Value, Value)> {
        self.entries.get(&name.key()?)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of rows that replaced an earlier entry of the same name
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

/// Extract coordinate records from a loaded table
///
/// Missing columns read as null so the join degrades to misses instead of
/// failing.
pub fn coordinates_from_table(table: &Table, columns: &JoinColumns) -> Vec<Coordinate> {
    for name in [&columns.coord_key, &columns.coord_x, &columns.coord_y] {
        if table.column_index(name).is_none() {
            warn!("Coordinate table has no '{}' column", name);
        }
    }

    let name_idx = table.column_index(&columns.coord_key);
    let x_idx = table.column_index(&columns.coord_x);
    let y_idx = table.column_index(&columns.coord_y);

    let field = |row: &[Value], index: Option<usize>| -> Value {
        index
            .and_then(|i| row.get(i))
            .cloned()
            .unwrap_or(Value::Null)
    };

    table
        .rows()
        .iter()
        .map(|row| Coordinate {
            name: field(row.as_slice(), name_idx),
            x: field(row.as_slice(), x_idx),
            y: field(row.as_slice(), y_idx),
        })
        .collect()
}

/// Join coordinates into the race table
///
/// Returns a new table holding every race column plus the two derived
/// columns, with one row per race.
pub fn join(races: &Table, coords: &[Coordinate], columns: &JoinColumns) -> (Table, JoinStats) {
    let lookup = CoordinateLookup::build(coords);
    let key_idx = races.column_index(&columns.race_key);
    if key_idx.is_none() {
        warn!(
            "Race table has no '{}' column, no race will be matched",
            columns.race_key
        );
    }

    let mut joined = races.clone();
    let x_idx = joined.ensure_column(&columns.derived_x);
    let y_idx = joined.ensure_column(&columns.derived_y);

    let mut stats = JoinStats {
        races: races.len(),
        coordinates: coords.len(),
        duplicate_names: lookup.duplicates(),
        ..Default::default()
    };

    for (row_idx, race) in races.rows().iter().enumerate() {
        let course = key_idx.and_then(|i| race.get(i));

        let (x, y) = match course.and_then(|c| lookup.get(c)) {
            Some((x, y)) => {
                stats.matched += 1;
                (x.clone(), y.clone())
            }
            None => {
                stats.unmatched += 1;
                let shown = course.cloned().unwrap_or(Value::Null);
                debug!("No coordinates for course '{}' (row {})", shown, row_idx + 1);
                (Value::Null, Value::Null)
            }
        };

        joined.set(row_idx, x_idx, x);
        joined.set(row_idx, y_idx, y);
    }

    debug!(
        "Joined {} races: {} matched, {} unmatched",
        stats.races, stats.matched, stats.unmatched
    );

    (joined, stats)
}
