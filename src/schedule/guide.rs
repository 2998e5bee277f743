//! Extraction of raw rows from a channel guide page.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::error::{SourceError, SourceResult};
use crate::model::RawRow;

pub(crate) fn selector(css: &str) -> SourceResult<Selector> {
    Selector::parse(css).map_err(|e| SourceError::Parse(format!("invalid selector '{}': {:?}", css, e)))
}

/// Parse the schedule table of a guide page.
///
/// Each `tr.point` row holds the start time, the title and the guide's genre
/// label in its first three cells. When the title cell carries a label line
/// before the title, the second line is the title. Rows with fewer than three
/// cells are skipped.
pub fn parse_guide_rows(html: &str) -> SourceResult<Vec<RawRow>> {
    let document = Html::parse_document(html);
    let row_selector = selector("tr.point")?;
    let cell_selector = selector("td")?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (index, row) in document.select(&row_selector).enumerate() {
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
        if cells.len() < 3 {
            warn!("⚠️ Skipping malformed guide row {} ({} cells)", index, cells.len());
            skipped += 1;
            continue;
        }

        let start_time = cell_text(&cells[0]);
        let raw_title = title_text(&cells[1]);
        let source_genre = cell_text(&cells[2]);

        if start_time.is_empty() {
            warn!("⚠️ Skipping guide row {} without a start time", index);
            skipped += 1;
            continue;
        }

        rows.push(RawRow {
            start_time,
            raw_title,
            source_genre,
        });
    }

    debug!("Parsed {} guide rows ({} skipped)", rows.len(), skipped);
    Ok(rows)
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn title_text(cell: &ElementRef) -> String {
    let text: String = cell.text().collect();
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() > 1 {
        lines[1].trim().to_string()
    } else {
        text.trim().to_string()
    }
}
