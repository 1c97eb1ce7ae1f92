//! Flat output records and the per-document table map.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::CellValue;

/// Column → value mapping for one destination row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OutputRecord {
    values: BTreeMap<String, CellValue>,
}

impl OutputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.values.insert(column.into(), value);
    }

    pub fn with(mut self, column: impl Into<String>, value: CellValue) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<CellValue> {
        self.values.remove(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.values.iter().map(|(column, value)| (column.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Table name → ordered records, for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RelationalOutput {
    tables: BTreeMap<String, Vec<OutputRecord>>,
}

impl RelationalOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records to a table. Empty batches leave the map untouched.
    pub fn extend_table(&mut self, table: impl Into<String>, records: Vec<OutputRecord>) {
        if records.is_empty() {
            return;
        }
        self.tables.entry(table.into()).or_default().extend(records);
    }

    pub fn merge(&mut self, other: RelationalOutput) {
        for (table, records) in other.tables {
            self.extend_table(table, records);
        }
    }

    pub fn table(&self, name: &str) -> Option<&[OutputRecord]> {
        self.tables.get(name).map(Vec::as_slice)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &[OutputRecord])> {
        self.tables
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn record_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batches_are_not_tables() {
        let mut output = RelationalOutput::new();
        output.extend_table("app_base", Vec::new());
        assert!(output.is_empty());

        output.extend_table(
            "app_base",
            vec![OutputRecord::new().with("app_id", CellValue::Integer(1))],
        );
        let mut other = RelationalOutput::new();
        other.extend_table(
            "app_base",
            vec![OutputRecord::new().with("app_id", CellValue::Integer(2))],
        );
        output.merge(other);
        assert_eq!(output.table("app_base").map(<[_]>::len), Some(2));
        assert_eq!(output.record_count(), 2);
    }

    #[test]
    fn serializes_as_nested_maps() {
        let mut output = RelationalOutput::new();
        output.extend_table(
            "t",
            vec![
                OutputRecord::new()
                    .with("b", CellValue::Bit(false))
                    .with("a", CellValue::Text("x".into())),
            ],
        );
        let json = serde_json::to_string(&output).unwrap();
        assert_eq!(json, r#"{"t":[{"a":"x","b":0}]}"#);
    }
}
