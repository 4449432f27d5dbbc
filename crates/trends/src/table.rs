use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

use crate::dates::format_day;

/// Dense topic × day count matrix.
///
/// Every row spans every day of the window; rows are kept sorted by topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendTable {
    days: Vec<NaiveDate>,
    rows: BTreeMap<String, Vec<u64>>,
}

impl TrendTable {
    /// A table with no rows and no columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Zero-filled table over `days` with one row per topic.
    pub fn zeroed<I, S>(days: Vec<NaiveDate>, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let width = days.len();
        let rows = topics
            .into_iter()
            .map(|topic| (topic.into(), vec![0u64; width]))
            .collect();
        Self { days, rows }
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    /// Column headers as ISO day strings.
    pub fn day_labels(&self) -> Vec<String> {
        self.days.iter().copied().map(format_day).collect()
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn row(&self, topic: &str) -> Option<&[u64]> {
        self.rows.get(topic).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[u64])> {
        self.rows.iter().map(|(topic, counts)| (topic.as_str(), counts.as_slice()))
    }

    /// Count for one cell; cells outside the table read as 0.
    pub fn count(&self, topic: &str, day: NaiveDate) -> u64 {
        let Some(col) = self.column_of(day) else { return 0 };
        self.rows.get(topic).map_or(0, |row| row[col])
    }

    pub fn column_of(&self, day: NaiveDate) -> Option<usize> {
        self.days.binary_search(&day).ok()
    }

    pub fn last_column(&self) -> Option<usize> {
        self.days.len().checked_sub(1)
    }

    pub(crate) fn increment(&mut self, topic: &str, col: usize) {
        if let Some(cell) = self.rows.get_mut(topic).and_then(|row| row.get_mut(col)) {
            *cell += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.rows.values().flatten().sum()
    }

    pub fn topic_count(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `topic -> day -> count` view with every cell present.
    pub fn to_nested_map(&self) -> BTreeMap<String, BTreeMap<String, u64>> {
        let labels = self.day_labels();
        self.rows
            .iter()
            .map(|(topic, counts)| {
                let cells = labels.iter().cloned().zip(counts.iter().copied()).collect();
                (topic.clone(), cells)
            })
            .collect()
    }
}

impl Serialize for TrendTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let labels = self.day_labels();
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for (topic, counts) in &self.rows {
            let cells: BTreeMap<&str, u64> = labels
                .iter()
                .map(String::as_str)
                .zip(counts.iter().copied())
                .collect();
            map.serialize_entry(topic, &cells)?;
        }
        map.end()
    }
}
