//! Crawl orchestration: one task per channel on a bounded worker pool, each
//! task owning its own session for the whole channel.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

use crate::cache::CacheSnapshot;
use crate::error::SourceResult;
use crate::model::{MetadataRecord, OutputRow, ProgramSlot};
use crate::resolver::Resolver;
use crate::schedule::ScheduleNormalizer;
use crate::sources::{Session, SessionFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelStatus {
    Completed,
    Failed,
}

/// What one channel task produced
#[derive(Debug, Clone)]
pub struct ChannelOutcome {
    pub channel: String,
    pub status: ChannelStatus,
    pub rows: Vec<OutputRow>,
    /// Titles resolved by this task, to be staged into the cache
    pub resolved: Vec<(String, MetadataRecord)>,
    pub cache_hits: usize,
    pub elapsed: Duration,
    pub error_message: Option<String>,
}

impl ChannelOutcome {
    fn failed(channel: &str, message: String, elapsed: Duration) -> Self {
        Self {
            channel: channel.to_string(),
            status: ChannelStatus::Failed,
            rows: Vec::new(),
            resolved: Vec::new(),
            cache_hits: 0,
            elapsed,
            error_message: Some(message),
        }
    }
}

/// Per-run counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub channels_total: usize,
    pub channels_ok: usize,
    pub channels_failed: usize,
    pub slots: usize,
    pub cache_hits: usize,
    pub resolutions: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn log(&self) {
        info!("🎯 Crawl Results:");
        info!("   Channels: {}", self.channels_total);
        info!("   Successful: {}", self.channels_ok);
        info!("   Failed: {}", self.channels_failed);
        info!("   Program slots: {}", self.slots);
        info!("   Cache hits: {}", self.cache_hits);
        info!("   New resolutions: {}", self.resolutions);
        info!("   Total time: {:.2}s", self.elapsed.as_secs_f64());
    }
}

/// Everything a crawl collected, ready for persistence
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    /// Rows in completion order; persistence sorts them
    pub rows: Vec<OutputRow>,
    /// Newly resolved records; a title may appear once per channel
    pub resolved: Vec<(String, MetadataRecord)>,
    pub summary: RunSummary,
}

/// Drives the per-channel pipeline with a fixed-size worker pool
pub struct CrawlOrchestrator {
    sessions: Arc<dyn SessionFactory>,
    normalizer: Arc<ScheduleNormalizer>,
    resolver: Resolver,
    max_workers: usize,
    worker_semaphore: Arc<Semaphore>,
}

impl CrawlOrchestrator {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        normalizer: ScheduleNormalizer,
        resolver: Resolver,
        max_workers: usize,
    ) -> Self {
        let max_workers = max_workers.max(1);
        info!("🔧 Initializing CrawlOrchestrator with {} workers", max_workers);

        Self {
            sessions,
            normalizer: Arc::new(normalizer),
            resolver,
            max_workers,
            worker_semaphore: Arc::new(Semaphore::new(max_workers)),
        }
    }

    /// Crawl every channel. `cache` is read-only for the whole run; new
    /// records come back in the result and are staged by the caller.
    pub async fn run(&self, channels: &[String], cache: CacheSnapshot) -> CrawlResult {
        let start_time = Instant::now();
        let total = channels.len();
        info!("🚀 Starting crawl of {} channels...", total);

        let (tx, mut rx) = mpsc::channel(self.max_workers);

        for (index, channel) in channels.iter().enumerate() {
            let task = ChannelTask {
                sessions: Arc::clone(&self.sessions),
                normalizer: Arc::clone(&self.normalizer),
                resolver: self.resolver.clone(),
                cache: Arc::clone(&cache),
            };
            let channel = channel.clone();
            let tx = tx.clone();
            let semaphore = Arc::clone(&self.worker_semaphore);

            tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("Worker pool closed before {}: {}", channel, e);
                        return;
                    }
                };

                info!("📡 Processing channel {}/{}: {}", index + 1, total, channel);
                let outcome = task.process_channel(&channel).await;

                if let Err(e) = tx.send(outcome).await {
                    error!("Failed to send result: {}", e);
                }
            });
        }

        drop(tx);

        let mut result = CrawlResult::default();
        result.summary.channels_total = total;

        while let Some(outcome) = rx.recv().await {
            match outcome.status {
                ChannelStatus::Completed => {
                    info!(
                        "✅ Completed: {} ({} slots) in {:.2}s",
                        outcome.channel,
                        outcome.rows.len(),
                        outcome.elapsed.as_secs_f64()
                    );
                    result.summary.channels_ok += 1;
                }
                ChannelStatus::Failed => {
                    warn!(
                        "❌ Failed: {} - {}",
                        outcome.channel,
                        outcome.error_message.as_deref().unwrap_or("Unknown error")
                    );
                    result.summary.channels_failed += 1;
                }
            }

            result.summary.slots += outcome.rows.len();
            result.summary.cache_hits += outcome.cache_hits;
            result.summary.resolutions += outcome.resolved.len();
            result.rows.extend(outcome.rows);
            result.resolved.extend(outcome.resolved);
        }

        // a task that never reported counts as failed
        let reported = result.summary.channels_ok + result.summary.channels_failed;
        result.summary.channels_failed += total.saturating_sub(reported);
        result.summary.elapsed = start_time.elapsed();
        result
    }
}

/// Shared handles moved into one spawned channel task
struct ChannelTask {
    sessions: Arc<dyn SessionFactory>,
    normalizer: Arc<ScheduleNormalizer>,
    resolver: Resolver,
    cache: CacheSnapshot,
}

impl ChannelTask {
    async fn process_channel(&self, channel: &str) -> ChannelOutcome {
        let start_time = Instant::now();

        let mut session = match self.sessions.open(channel).await {
            Ok(session) => session,
            Err(e) => {
                return ChannelOutcome::failed(channel, format!("cannot open session: {}", e), start_time.elapsed());
            }
        };

        let crawled = self.crawl_with_session(channel, session.as_mut()).await;

        if let Err(e) = session.close().await {
            warn!("⚠️ {}: session teardown failed: {}", channel, e);
        }

        match crawled {
            Ok(mut outcome) => {
                outcome.elapsed = start_time.elapsed();
                outcome
            }
            Err(e) => ChannelOutcome::failed(channel, e.to_string(), start_time.elapsed()),
        }
    }

    async fn crawl_with_session(&self, channel: &str, session: &mut dyn Session) -> SourceResult<ChannelOutcome> {
        let raw_rows = session.fetch_rows(channel).await?;
        let slots = self.normalizer.normalize(channel, &raw_rows);

        let mut outcome = ChannelOutcome {
            channel: channel.to_string(),
            status: ChannelStatus::Completed,
            rows: Vec::with_capacity(slots.len()),
            resolved: Vec::new(),
            cache_hits: 0,
            elapsed: Duration::ZERO,
            error_message: None,
        };
        let mut memo: HashMap<String, MetadataRecord> = HashMap::new();

        for slot in &slots {
            let record = self.record_for(slot, session, &mut memo, &mut outcome).await;
            outcome.rows.push(OutputRow::from_slot(slot, &record));
        }

        Ok(outcome)
    }

    /// Cache snapshot first, then this channel's memo, then the resolver.
    /// Slots are resolved one at a time on the channel's own session.
    async fn record_for(
        &self,
        slot: &ProgramSlot,
        session: &mut dyn Session,
        memo: &mut HashMap<String, MetadataRecord>,
        outcome: &mut ChannelOutcome,
    ) -> MetadataRecord {
        if let Some(record) = self.cache.get(&slot.title) {
            debug!("💾 Cache hit: {}", slot.title);
            outcome.cache_hits += 1;
            return record.clone();
        }
        if let Some(record) = memo.get(&slot.title) {
            return record.clone();
        }

        let record = self
            .resolver
            .resolve(&slot.title, &slot.source_genre, &slot.channel, &mut *session)
            .await;
        memo.insert(slot.title.clone(), record.clone());
        outcome.resolved.push((slot.title.clone(), record.clone()));
        record
    }
}
