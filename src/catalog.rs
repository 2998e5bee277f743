//! Daily output table: program id assignment and CSV persistence.

use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::CatalogError;
use crate::model::{AgeRating, Genre, OutputRow};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

static CHANNEL_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\[[^\]]*\]").unwrap());

/// `<YYYY-MM-DD>_program_list.csv`
pub fn daily_file_name(date: NaiveDate) -> String {
    format!("{}_program_list.csv", date.format("%Y-%m-%d"))
}

/// `<channel without its [number]>_program_list.csv`
pub fn channel_file_name(channel: &str) -> String {
    let name = CHANNEL_NUMBER.replace_all(channel, "");
    format!("{}_program_list.csv", name.trim())
}

pub(crate) fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Write a CSV body prefixed with a UTF-8 BOM, creating parent directories
pub(crate) async fn write_with_bom(path: &Path, body: Vec<u8>) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CatalogError::io(parent, e))?;
    }
    let mut content = Vec::with_capacity(body.len() + UTF8_BOM.len());
    content.extend_from_slice(UTF8_BOM);
    content.extend_from_slice(&body);
    tokio::fs::write(path, content)
        .await
        .map_err(|e| CatalogError::io(path, e))
}

/// Highest `program_id` in an earlier output table; 0 when the file is
/// missing or holds no readable id
pub async fn last_program_id(path: &Path) -> u64 {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("🆕 No previous table at {}, program ids start at 1", path.display());
            return 0;
        }
        Err(e) => {
            warn!("⚠️ Could not read {}: {}; program ids start at 1", path.display(), e);
            return 0;
        }
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(strip_bom(&bytes));

    let column = match reader.headers() {
        Ok(headers) => headers.iter().position(|h| h.trim() == "program_id"),
        Err(e) => {
            warn!("⚠️ Unreadable header in {}: {}", path.display(), e);
            None
        }
    };
    let Some(column) = column else {
        warn!("⚠️ No program_id column in {}; program ids start at 1", path.display());
        return 0;
    };

    reader
        .records()
        .filter_map(|record| record.ok())
        .filter_map(|record| record.get(column).and_then(|v| v.trim().parse::<u64>().ok()))
        .max()
        .unwrap_or(0)
}

/// Sort rows by (channel, airtime) and number them from `last_id + 1`
pub fn assign_program_ids(rows: &mut [OutputRow], last_id: u64) {
    rows.sort_by(|a, b| (&a.channel, &a.airtime).cmp(&(&b.channel, &b.airtime)));
    for (index, row) in rows.iter_mut().enumerate() {
        row.program_id = last_id + index as u64 + 1;
    }
}

/// Per-channel projection of an output row
#[derive(Debug, Serialize)]
struct ChannelRow<'a> {
    channel: &'a str,
    airtime: &'a str,
    title: &'a str,
    episode: Option<u32>,
    genre: Option<Genre>,
    subgenre: &'a str,
    runtime: u32,
    description: &'a str,
    thumbnail: &'a str,
    age_rating: AgeRating,
    cast: &'a str,
}

impl<'a> From<&'a OutputRow> for ChannelRow<'a> {
    fn from(row: &'a OutputRow) -> Self {
        Self {
            channel: &row.channel,
            airtime: &row.airtime,
            title: &row.title,
            episode: row.episode,
            genre: row.genre,
            subgenre: &row.subgenre,
            runtime: row.runtime,
            description: &row.description,
            thumbnail: &row.thumbnail,
            age_rating: row.age_rating,
            cast: &row.cast,
        }
    }
}

/// Result of writing the daily table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTable {
    pub path: PathBuf,
    pub rows: usize,
    pub first_id: u64,
    pub last_id: u64,
}

/// Writes the daily and per-channel tables under one data directory
#[derive(Debug, Clone)]
pub struct CatalogWriter {
    data_dir: PathBuf,
}

impl CatalogWriter {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir.join(daily_file_name(date))
    }

    /// Number the rows after yesterday's maximum id and write `date`'s table.
    ///
    /// Refuses to write when nothing was collected.
    pub async fn write_daily(
        &self,
        date: NaiveDate,
        rows: &mut Vec<OutputRow>,
    ) -> Result<DailyTable, CatalogError> {
        if rows.is_empty() {
            return Err(CatalogError::NoCollectedData);
        }

        let last_id = match date.checked_sub_days(Days::new(1)) {
            Some(yesterday) => last_program_id(&self.daily_path(yesterday)).await,
            None => 0,
        };
        assign_program_ids(rows, last_id);

        let path = self.daily_path(date);
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows.iter() {
            writer.serialize(row).map_err(|e| CatalogError::csv(&path, e))?;
        }
        let body = writer
            .into_inner()
            .map_err(|e| CatalogError::io(&path, e.into_error()))?;
        write_with_bom(&path, body).await?;

        let table = DailyTable {
            path,
            rows: rows.len(),
            first_id: last_id + 1,
            last_id: last_id + rows.len() as u64,
        };
        info!(
            "💾 Saved {} programs (ids {}..={}) -> {}",
            table.rows,
            table.first_id,
            table.last_id,
            table.path.display()
        );
        Ok(table)
    }

    /// Write one table per channel, each sorted by airtime
    pub async fn write_channel_files(&self, rows: &[OutputRow]) -> Result<Vec<PathBuf>, CatalogError> {
        let mut channels: Vec<&str> = rows.iter().map(|r| r.channel.as_str()).collect();
        channels.sort_unstable();
        channels.dedup();

        let mut written = Vec::with_capacity(channels.len());
        for channel in channels {
            let mut channel_rows: Vec<&OutputRow> = rows.iter().filter(|r| r.channel == channel).collect();
            channel_rows.sort_by(|a, b| a.airtime.cmp(&b.airtime));

            let path = self.data_dir.join(channel_file_name(channel));
            let mut writer = csv::Writer::from_writer(Vec::new());
            for row in channel_rows {
                writer
                    .serialize(ChannelRow::from(row))
                    .map_err(|e| CatalogError::csv(&path, e))?;
            }
            let body = writer
                .into_inner()
                .map_err(|e| CatalogError::io(&path, e.into_error()))?;
            write_with_bom(&path, body).await?;
            written.push(path);
        }

        info!("📁 Wrote {} channel tables", written.len());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(channel: &str, airtime: &str) -> OutputRow {
        OutputRow {
            program_id: 0,
            channel: channel.to_string(),
            airtime: airtime.to_string(),
            title: format!("{} {}", channel, airtime),
            episode: None,
            genre: Some(Genre::Drama),
            subgenre: String::new(),
            runtime: 60,
            description: String::new(),
            thumbnail: String::new(),
            age_rating: AgeRating::AllAges,
            cast: String::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_file_names() {
        assert_eq!(daily_file_name(date(2025, 3, 1)), "2025-03-01_program_list.csv");
        assert_eq!(channel_file_name("OCN Movies2[51]"), "OCN Movies2_program_list.csv");
        assert_eq!(channel_file_name("KBS1[9]"), "KBS1_program_list.csv");
    }

    #[test]
    fn test_assign_program_ids_sorts_and_continues() {
        let mut rows = vec![row("SBS[5]", "07:00:00"), row("KBS1[9]", "09:00:00"), row("KBS1[9]", "06:00:00")];
        assign_program_ids(&mut rows, 41);

        let ids: Vec<u64> = rows.iter().map(|r| r.program_id).collect();
        assert_eq!(ids, vec![42, 43, 44]);
        assert_eq!(rows[0].airtime, "06:00:00");
        assert_eq!(rows[2].channel, "SBS[5]");
    }

    #[tokio::test]
    async fn test_write_daily_continues_from_yesterday() {
        let dir = TempDir::new().unwrap();
        let writer = CatalogWriter::new(dir.path());

        let mut day_one = vec![row("KBS1[9]", "06:00:00"), row("KBS1[9]", "07:00:00")];
        let first = writer.write_daily(date(2025, 3, 1), &mut day_one).await.unwrap();
        assert_eq!((first.first_id, first.last_id), (1, 2));

        let mut day_two = vec![row("MBC[11]", "06:00:00")];
        let second = writer.write_daily(date(2025, 3, 2), &mut day_two).await.unwrap();
        assert_eq!((second.first_id, second.last_id), (3, 3));
        assert_eq!(day_two[0].program_id, 3);
    }

    #[tokio::test]
    async fn test_write_daily_refuses_empty_table() {
        let dir = TempDir::new().unwrap();
        let writer = CatalogWriter::new(dir.path());

        let result = writer.write_daily(date(2025, 3, 1), &mut Vec::new()).await;
        assert!(matches!(result, Err(CatalogError::NoCollectedData)));
        assert!(!writer.daily_path(date(2025, 3, 1)).exists());
    }

    #[tokio::test]
    async fn test_last_program_id_tolerates_bom_and_bad_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.csv");
        tokio::fs::write(&path, "\u{feff}program_id,channel\n7,A\nxx,B\n12,C\n")
            .await
            .unwrap();

        assert_eq!(last_program_id(&path).await, 12);
        assert_eq!(last_program_id(&dir.path().join("missing.csv")).await, 0);
    }

    #[test]
    fn test_last_program_id_of_unreadable_file() {
        let dir = TempDir::new().unwrap();
        // a directory cannot be read as a table
        tokio_test::block_on(async {
            assert_eq!(last_program_id(dir.path()).await, 0);
        });
    }

    #[tokio::test]
    async fn test_write_channel_files() {
        let dir = TempDir::new().unwrap();
        let writer = CatalogWriter::new(dir.path());
        let rows = vec![row("KBS1[9]", "09:00:00"), row("KBS1[9]", "06:00:00"), row("MBC[11]", "06:00:00")];

        let paths = writer.write_channel_files(&rows).await.unwrap();
        assert_eq!(paths.len(), 2);

        let content = tokio::fs::read_to_string(dir.path().join("KBS1_program_list.csv"))
            .await
            .unwrap();
        let first_data_line = content.lines().nth(1).unwrap();
        assert!(first_data_line.contains("06:00:00"));
        assert!(!content.contains("program_id"));
    }
}
