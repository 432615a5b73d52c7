//! Table → columns mapping handed to the generator.

use std::collections::HashMap;

/// Mapping from table name to its columns.
///
/// Tables keep the order in which they were first seen; columns keep the
/// order in which they arrived. Every table has at least one column, since
/// a table only appears once a column for it has been pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaMap {
    tables: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl SchemaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `column` under `table`, creating the table entry on first use.
    pub fn push(&mut self, table: impl Into<String>, column: impl Into<String>) {
        let table = table.into();
        let slot = match self.index.get(&table) {
            Some(&i) => i,
            None => {
                let i = self.tables.len();
                self.index.insert(table.clone(), i);
                self.tables.push((table, Vec::new()));
                i
            }
        };
        self.tables[slot].1.push(column.into());
    }

    /// Iterate `(table, columns)` in first-seen order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tables
            .iter()
            .map(|(t, cols)| (t.as_str(), cols.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// One `Table: col1, col2, ...` line per table.
    pub fn render(&self) -> String {
        self.tables()
            .map(|(table, cols)| format!("{table}: {}", cols.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<T, C> FromIterator<(T, C)> for SchemaMap
where
    T: Into<String>,
    C: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (T, C)>>(iter: I) -> Self {
        let mut map = SchemaMap::new();
        for (table, column) in iter {
            map.push(table, column);
        }
        map
    }
}
