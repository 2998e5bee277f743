//! Schedule normalization: raw guide rows become ordered program slots with
//! runtimes, merged simultaneous broadcasts and extracted episode numbers.

pub mod guide;
pub mod text;

pub use guide::parse_guide_rows;
pub use text::{clean_query_title, clean_title, collapse_whitespace, extract_episode};

use chrono::NaiveTime;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::model::{ProgramSlot, RawRow, AIRTIME_FORMAT};
use crate::taxonomy::GenreTaxonomy;

/// Runtime of the last slot of a channel's day
pub const LAST_SLOT_RUNTIME_MINUTES: u32 = 60;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// A row that survived cleanup but has no runtime yet
#[derive(Debug, Clone)]
struct PendingSlot {
    start: NaiveTime,
    title: String,
    source_genre: String,
    episode: Option<u32>,
}

/// Turns per-channel raw rows into [`ProgramSlot`]s
#[derive(Debug, Clone)]
pub struct ScheduleNormalizer {
    taxonomy: Arc<GenreTaxonomy>,
}

impl ScheduleNormalizer {
    pub fn new(taxonomy: Arc<GenreTaxonomy>) -> Self {
        Self { taxonomy }
    }

    /// Normalize one channel's rows, in guide order.
    ///
    /// Rows with an unreadable start time or an empty title are skipped and
    /// logged; they never abort the channel.
    pub fn normalize(&self, channel: &str, rows: &[RawRow]) -> Vec<ProgramSlot> {
        let pending: Vec<PendingSlot> = rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| self.prepare(channel, index, row))
            .collect();

        let merged = merge_simultaneous(pending);
        let slots = assign_runtimes(channel, merged);

        debug!("📺 {}: {} raw rows -> {} slots", channel, rows.len(), slots.len());
        slots
    }

    fn prepare(&self, channel: &str, index: usize, row: &RawRow) -> Option<PendingSlot> {
        let Some(start) = parse_start_time(&row.start_time) else {
            warn!(
                "⚠️ {}: skipping row {} with unreadable start time '{}'",
                channel, index, row.start_time
            );
            return None;
        };

        let (without_episode, episode) = extract_episode(&row.raw_title);
        let title = clean_title(&without_episode);

        if self.taxonomy.is_not_broadcasting(&title) {
            debug!("{}: dropping off-air row at {}", channel, row.start_time);
            return None;
        }
        if title.is_empty() {
            warn!("⚠️ {}: skipping row {} with empty title", channel, index);
            return None;
        }

        Some(PendingSlot {
            start,
            title,
            source_genre: self.taxonomy.map_source_genre(&row.source_genre),
            episode,
        })
    }
}

/// Parse `HH:MM:SS`, tolerating `HH:MM`
pub fn parse_start_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, AIRTIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

/// Consecutive rows with the same start time form one dual-genre slot; the
/// first row's title and episode are kept.
fn merge_simultaneous(pending: Vec<PendingSlot>) -> Vec<PendingSlot> {
    let mut merged: Vec<PendingSlot> = Vec::with_capacity(pending.len());
    for slot in pending {
        match merged.last_mut() {
            Some(previous) if previous.start == slot.start => {
                previous.source_genre.push_str(&slot.source_genre);
            }
            _ => merged.push(slot),
        }
    }
    merged
}

fn assign_runtimes(channel: &str, merged: Vec<PendingSlot>) -> Vec<ProgramSlot> {
    let starts: Vec<NaiveTime> = merged.iter().map(|s| s.start).collect();

    merged
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            let runtime_minutes = match starts.get(i + 1) {
                Some(next) => runtime_between(slot.start, *next),
                None => LAST_SLOT_RUNTIME_MINUTES,
            };
            ProgramSlot {
                channel: channel.to_string(),
                start: slot.start,
                title: slot.title,
                source_genre: slot.source_genre,
                runtime_minutes,
                episode: slot.episode,
            }
        })
        .collect()
}

/// Minutes from `start` to `next`, wrapping past midnight; never below 1
pub fn runtime_between(start: NaiveTime, next: NaiveTime) -> u32 {
    let minutes = (next - start).num_minutes().rem_euclid(MINUTES_PER_DAY);
    minutes.max(1) as u32
}
