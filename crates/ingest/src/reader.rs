use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::review::Review;

pub struct ReviewReader;

impl ReviewReader {
    /// Load a review batch from a `.json` array or a `.jsonl` file.
    pub async fn read_file(path: &Path) -> Result<Vec<Review>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let content = match extension {
            "json" | "jsonl" => fs::read_to_string(path)
                .await
                .context(format!("Failed to read reviews file: {:?}", path))?,
            _ => anyhow::bail!("Unsupported reviews format: {}", extension),
        };

        let reviews = match extension {
            "jsonl" => Self::parse_lines(&content)?,
            _ => serde_json::from_str(&content)
                .context(format!("Failed to parse reviews from {:?}", path))?,
        };

        debug!(path = %path.display(), reviews = reviews.len(), "Loaded review batch");
        Ok(reviews)
    }

    fn parse_lines(content: &str) -> Result<Vec<Review>> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line)
                    .context(format!("Invalid review on line {}", idx + 1))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.json");
        std::fs::write(
            &path,
            r#"[{"text": "The app crashes", "date": "2025-10-05"}, {"text": "Great"}]"#,
        )
        .unwrap();

        let reviews = ReviewReader::read_file(&path).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[1].date, None);
    }

    #[tokio::test]
    async fn test_reads_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.jsonl");
        std::fs::write(
            &path,
            "{\"text\": \"a\", \"date\": \"2025-10-01\"}\n\n{\"text\": \"b\", \"date\": \"2025-10-02\"}\n",
        )
        .unwrap();

        let reviews = ReviewReader::read_file(&path).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].text, "a");
    }

    #[tokio::test]
    async fn test_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        std::fs::write(&path, "text,date\n").unwrap();

        assert!(ReviewReader::read_file(&path).await.is_err());
    }
}
