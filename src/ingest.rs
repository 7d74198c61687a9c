use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::warn;

/// One focus change record from the tracker export.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub app: Arc<str>,
    pub title: Arc<str>,
    pub start: DateTime<Utc>,
    pub duration: Duration,
}

impl RawEvent {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }
}

/// Row shape of the export. Extra columns are ignored, a missing required
/// column fails the row, not the run.
#[derive(Debug, Deserialize)]
struct ExportRow {
    timestamp: String,
    duration: f64,
    app: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoadStats {
    pub total_rows: usize,
    pub skipped_rows: usize,
}

/// Reads every export file and concatenates their rows. Rows that cannot be
/// parsed are skipped with a warning. Fails when rows were present but none
/// of them could be used; an export with no rows at all is legal and simply
/// yields an empty report downstream.
pub async fn load_events(paths: &[PathBuf]) -> Result<(Vec<RawEvent>, LoadStats)> {
    let mut events = vec![];
    let mut stats = LoadStats::default();

    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read export {path:?}"))?;
        parse_export(&bytes, path, &mut events, &mut stats);
    }

    if events.is_empty() && stats.total_rows > 0 {
        bail!(
            "no usable data: 0 of {} rows could be parsed",
            stats.total_rows
        );
    }
    Ok((events, stats))
}

fn parse_export(bytes: &[u8], path: &Path, out: &mut Vec<RawEvent>, stats: &mut LoadStats) {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(bytes);

    for (index, row) in reader.deserialize::<ExportRow>().enumerate() {
        stats.total_rows += 1;
        // Header is row 1, so the first data row reports as row 2.
        let row_number = index + 2;
        match row.map_err(anyhow::Error::from).and_then(convert_row) {
            Ok(event) => out.push(event),
            Err(e) => {
                stats.skipped_rows += 1;
                warn!("Skipping row {row_number} of {path:?}: {e}");
            }
        }
    }
}

fn convert_row(row: ExportRow) -> Result<RawEvent> {
    let start = DateTime::parse_from_rfc3339(&row.timestamp)
        .map_err(|e| anyhow!("bad timestamp {:?}: {e}", row.timestamp))?
        .with_timezone(&Utc);

    if !row.duration.is_finite() || row.duration < 0. {
        bail!("bad duration {}", row.duration);
    }

    Ok(RawEvent {
        app: row.app.into(),
        title: row.title.into(),
        start,
        duration: Duration::milliseconds((row.duration * 1000.).round() as i64),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use chrono::Duration;
    use tempfile::NamedTempFile;

    use crate::utils::logging::TEST_LOGGING;

    use super::load_events;

    fn write_export(content: &str) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(content.as_bytes())?;
        Ok(file)
    }

    #[tokio::test]
    async fn loads_rows_and_skips_malformed_ones() -> Result<()> {
        *TEST_LOGGING;

        let file = write_export(
            "timestamp,duration,app,title\n\
             2025-01-06T09:00:00Z,120.5,Code,main.rs\n\
             not-a-timestamp,60,Code,broken\n\
             2025-01-06T09:05:00Z,-3,Code,negative\n\
             2025-01-06T09:02:00+00:00,0,Finder,\n",
        )?;

        let (events, stats) = load_events(&[file.path().to_path_buf()]).await?;

        assert_eq!(stats.total_rows, 4);
        assert_eq!(stats.skipped_rows, 2);
        assert_eq!(events.len(), 2);
        assert_eq!(&*events[0].app, "Code");
        assert_eq!(events[0].duration, Duration::milliseconds(120_500));
        // Zero duration rows survive loading, the session builder drops them.
        assert_eq!(events[1].duration, Duration::zero());
        Ok(())
    }

    #[tokio::test]
    async fn concatenates_multiple_exports() -> Result<()> {
        *TEST_LOGGING;

        let first = write_export(
            "timestamp,duration,app,title\n2025-01-06T09:00:00Z,60,Code,one\n",
        )?;
        let second = write_export(
            "timestamp,duration,app,title\n2025-01-07T09:00:00Z,60,Code,two\n",
        )?;

        let (events, stats) =
            load_events(&[first.path().to_path_buf(), second.path().to_path_buf()]).await?;
        assert_eq!(events.len(), 2);
        assert_eq!(stats.total_rows, 2);
        Ok(())
    }

    #[tokio::test]
    async fn fails_when_nothing_is_usable() -> Result<()> {
        *TEST_LOGGING;

        let file = write_export("timestamp,duration,app,title\nbroken,x,Code,\n")?;
        let err = load_events(&[file.path().to_path_buf()]).await.unwrap_err();
        assert!(err.to_string().contains("no usable data"), "{err}");
        Ok(())
    }

    #[tokio::test]
    async fn header_only_export_is_empty_but_legal() -> Result<()> {
        *TEST_LOGGING;

        let file = write_export("timestamp,duration,app,title\n")?;
        let (events, stats) = load_events(&[file.path().to_path_buf()]).await?;
        assert!(events.is_empty());
        assert_eq!(stats.total_rows, 0);
        Ok(())
    }
}
