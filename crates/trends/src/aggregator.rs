use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::dates::{day_range, parse_day};
use crate::table::TrendTable;
use crate::MappedObservation;

/// Bookkeeping for one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateSummary {
    pub received: usize,
    /// Observations whose date did not parse.
    pub dropped_malformed: usize,
    /// Observations dated outside the window, credited to the last day.
    pub overflowed: usize,
    /// Out-of-window observations that had no column to land in (empty window).
    pub unplaced: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub table: TrendTable,
    pub summary: AggregateSummary,
}

/// Folds observations into a daily trend table over an inclusive window.
pub struct TrendAggregator {
    start: NaiveDate,
    end: NaiveDate,
}

impl TrendAggregator {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn aggregate(&self, observations: &[MappedObservation]) -> Aggregation {
        let mut summary = AggregateSummary {
            received: observations.len(),
            ..Default::default()
        };

        if observations.is_empty() {
            return Aggregation {
                table: TrendTable::empty(),
                summary,
            };
        }

        let mut parsed: Vec<(&str, NaiveDate)> = Vec::with_capacity(observations.len());
        for obs in observations {
            match parse_day(&obs.date) {
                Ok(day) => parsed.push((obs.topic.as_str(), day)),
                Err(e) => {
                    debug!(topic = %obs.topic, error = %e, "Dropping observation");
                    summary.dropped_malformed += 1;
                }
            }
        }

        let topics: BTreeSet<&str> = parsed.iter().map(|(topic, _)| *topic).collect();
        let mut table = TrendTable::zeroed(day_range(self.start, self.end), topics);

        for (topic, day) in parsed {
            if let Some(col) = table.column_of(day) {
                table.increment(topic, col);
                continue;
            }

            // Out-of-window dates are credited to the window's last day.
            match table.last_column() {
                Some(last) => {
                    debug!(topic, day = %day, "Routing out-of-window observation to last day");
                    table.increment(topic, last);
                    summary.overflowed += 1;
                }
                None => summary.unplaced += 1,
            }
        }

        info!(
            received = summary.received,
            dropped = summary.dropped_malformed,
            overflowed = summary.overflowed,
            topics = table.topic_count(),
            days = table.days().len(),
            "Aggregated trend table"
        );

        Aggregation { table, summary }
    }
}
