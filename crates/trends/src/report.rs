use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::table::TrendTable;
use crate::TrendError;

pub struct ReportWriter;

impl ReportWriter {
    /// Render the table as CSV: a `topic` column followed by one column per day.
    pub fn to_csv(table: &TrendTable) -> Result<Vec<u8>, TrendError> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header = vec!["topic".to_string()];
        header.extend(table.day_labels());
        writer.write_record(&header)?;

        for (topic, counts) in table.rows() {
            let mut record = Vec::with_capacity(counts.len() + 1);
            record.push(topic.to_string());
            record.extend(counts.iter().map(u64::to_string));
            writer.write_record(&record)?;
        }

        writer.into_inner().map_err(|e| TrendError::Io(e.into_error()))
    }

    /// Write the CSV report, creating parent directories as needed.
    pub async fn write_csv(table: &TrendTable, path: &Path) -> Result<(), TrendError> {
        let bytes = Self::to_csv(table)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, bytes).await?;

        info!(path = %path.display(), topics = table.topic_count(), days = table.days().len(), "Report saved");
        Ok(())
    }
}
