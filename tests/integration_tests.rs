use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use iptv_catalog::catalog::{last_program_id, CatalogWriter};
use iptv_catalog::error::{CatalogError, SourceError, SourceResult};
use iptv_catalog::model::{AgeRating, Genre, MetadataRecord, OutputRow, ProgramSlot, RawRow};
use iptv_catalog::sources::{
    CatalogDetail, CatalogGenre, CatalogHit, CatalogService, ChannelGuide, DisabledCompletion, MediaKind,
    SecondaryHit, SecondarySearch, Session, SessionFactory,
};
use iptv_catalog::{CrawlOrchestrator, GenreTaxonomy, MetadataCache, Resolver, ResolverRules, ScheduleNormalizer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Catalog that knows a single drama
#[derive(Default)]
struct OneDramaCatalog {
    searches: AtomicUsize,
}

#[async_trait]
impl CatalogService for OneDramaCatalog {
    async fn search(&self, title: &str, kind: MediaKind) -> SourceResult<Vec<CatalogHit>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if title == "사랑의 이해" && kind == MediaKind::Tv {
            Ok(vec![CatalogHit {
                id: 7,
                name: title.to_string(),
            }])
        } else {
            Ok(Vec::new())
        }
    }

    async fn detail(&self, _id: u64, _kind: MediaKind) -> SourceResult<CatalogDetail> {
        Ok(CatalogDetail {
            overview: "  은행원들의   사랑 이야기 ".to_string(),
            poster_url: Some("https://image.example/love.jpg".to_string()),
            genres: vec![CatalogGenre {
                id: Some(10749),
                name: "Romance".to_string(),
            }],
            age_rating: Some("15".to_string()),
        })
    }

    async fn credits(&self, _id: u64, _kind: MediaKind) -> SourceResult<Vec<String>> {
        Ok(vec!["유연석".to_string(), "문가영".to_string()])
    }
}

struct ScriptedSession {
    rows: Option<Vec<RawRow>>,
}

#[async_trait]
impl ChannelGuide for ScriptedSession {
    async fn fetch_rows(&mut self, channel: &str) -> SourceResult<Vec<RawRow>> {
        self.rows
            .clone()
            .ok_or_else(|| SourceError::Timeout(format!("guide page for {}", channel)))
    }
}

#[async_trait]
impl SecondarySearch for ScriptedSession {
    async fn lookup_genre_and_thumbnail(&mut self, title: &str) -> SourceResult<SecondaryHit> {
        match title {
            "뽀로로" => Ok(SecondaryHit {
                genre_label: "애니".to_string(),
                thumbnail: "https://search.example/pororo.jpg".to_string(),
            }),
            _ => Ok(SecondaryHit::default()),
        }
    }

    async fn lookup_cast(&mut self, _title: &str) -> SourceResult<Vec<String>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn close(&mut self) -> SourceResult<()> {
        Ok(())
    }
}

struct ScriptedGuide {
    schedules: HashMap<String, Vec<RawRow>>,
}

#[async_trait]
impl SessionFactory for ScriptedGuide {
    async fn open(&self, channel: &str) -> SourceResult<Box<dyn Session>> {
        Ok(Box::new(ScriptedSession {
            rows: self.schedules.get(channel).cloned(),
        }))
    }
}

fn guide() -> ScriptedGuide {
    let mut schedules = HashMap::new();
    schedules.insert(
        "KBS2[7]".to_string(),
        vec![
            RawRow::new("06:00:00", "사랑의 이해 3회", "드라마"),
            RawRow::new("07:00:00", "세계테마기행 (재)", "다큐"),
            RawRow::new("23:30:00", "뉴스 9", "뉴스/정보"),
        ],
    );
    schedules.insert(
        "투니버스[324]".to_string(),
        vec![RawRow::new("10:00:00", "뽀로로", "만화")],
    );
    ScriptedGuide { schedules }
}

fn crawler(catalog: Arc<OneDramaCatalog>) -> CrawlOrchestrator {
    let taxonomy = Arc::new(GenreTaxonomy::new());
    let resolver = Resolver::new(
        Arc::clone(&taxonomy),
        Arc::new(ResolverRules::default()),
        catalog,
        Arc::new(DisabledCompletion),
    );
    CrawlOrchestrator::new(Arc::new(guide()), ScheduleNormalizer::new(taxonomy), resolver, 2)
}

fn channels(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()
}

fn find<'a>(rows: &'a [OutputRow], title: &str) -> &'a OutputRow {
    rows.iter().find(|r| r.title == title).unwrap()
}

#[tokio::test]
async fn test_full_run_resolves_and_numbers_rows() {
    let temp_dir = TempDir::new().unwrap();
    let writer = CatalogWriter::new(temp_dir.path());

    // yesterday's table ends at id 2
    let slot = ProgramSlot {
        channel: "KBS1[9]".to_string(),
        start: NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
        title: "아침마당".to_string(),
        source_genre: "Variety".to_string(),
        runtime_minutes: 60,
        episode: None,
    };
    let mut yesterday_rows = vec![OutputRow::from_slot(&slot, &MetadataRecord::default()); 2];
    yesterday_rows[1].airtime = "06:00:00".to_string();
    writer
        .write_daily(run_date().pred_opt().unwrap(), &mut yesterday_rows)
        .await
        .unwrap();

    let catalog = Arc::new(OneDramaCatalog::default());
    let result = crawler(Arc::clone(&catalog))
        .run(&channels(&["KBS2[7]", "투니버스[324]"]), Arc::new(HashMap::new()))
        .await;

    assert_eq!(result.summary.channels_ok, 2);
    assert_eq!(result.summary.slots, 4);

    let mut rows = result.rows;
    let table = writer.write_daily(run_date(), &mut rows).await.unwrap();
    assert_eq!((table.first_id, table.last_id), (3, 6));
    assert_eq!(last_program_id(&table.path).await, 6);

    // sorted by (channel, airtime)
    let order: Vec<(&str, &str)> = rows.iter().map(|r| (r.channel.as_str(), r.title.as_str())).collect();
    assert_eq!(
        order,
        vec![
            ("KBS2[7]", "사랑의 이해"),
            ("KBS2[7]", "세계테마기행"),
            ("KBS2[7]", "뉴스 9"),
            ("투니버스[324]", "뽀로로"),
        ]
    );
    let ids: Vec<u64> = rows.iter().map(|r| r.program_id).collect();
    assert_eq!(ids, vec![3, 4, 5, 6]);

    let drama = find(&rows, "사랑의 이해");
    assert_eq!(drama.genre, Some(Genre::Drama));
    assert_eq!(drama.subgenre, "Romance");
    assert_eq!(drama.description, "은행원들의 사랑 이야기");
    assert_eq!(drama.thumbnail, "https://image.example/love.jpg");
    assert_eq!(drama.age_rating, AgeRating::Fifteen);
    assert_eq!(drama.cast, "유연석, 문가영");
    assert_eq!(drama.episode, Some(3));
    assert_eq!(drama.runtime, 60);

    let travel = find(&rows, "세계테마기행");
    assert_eq!(travel.genre, Some(Genre::Variety));
    assert_eq!(travel.subgenre, "Travel, Documentary");
    assert_eq!(travel.runtime, 16 * 60 + 30);

    let news = find(&rows, "뉴스 9");
    assert_eq!(news.genre, Some(Genre::News));
    assert_eq!(news.subgenre, "News");
    assert_eq!(news.description, "뉴스 9");
    assert_eq!(news.runtime, 60);

    let anime = find(&rows, "뽀로로");
    assert_eq!(anime.genre, Some(Genre::Anime));
    assert_eq!(anime.subgenre, "Kids");
    assert_eq!(anime.thumbnail, "https://search.example/pororo.jpg");
    assert_eq!(anime.age_rating, AgeRating::AllAges);

    let written = writer.write_channel_files(&rows).await.unwrap();
    assert_eq!(written.len(), 2);
    assert!(temp_dir.path().join("KBS2_program_list.csv").exists());
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let temp_dir = TempDir::new().unwrap();
    let cache_path = temp_dir.path().join("metadata_cache.csv");

    let catalog = Arc::new(OneDramaCatalog::default());
    let mut cache = MetadataCache::load(&cache_path).await.unwrap();
    let first = crawler(Arc::clone(&catalog))
        .run(&channels(&["KBS2[7]"]), cache.snapshot())
        .await;
    for (title, record) in first.resolved {
        cache.record(&title, record);
    }
    assert_eq!(cache.flush().await.unwrap(), 3);
    let searches_after_first = catalog.searches.load(Ordering::SeqCst);
    assert!(searches_after_first > 0);

    let reloaded = MetadataCache::load(&cache_path).await.unwrap();
    let cached = reloaded.lookup("사랑의 이해").unwrap();
    assert_eq!(cached.genre, Some(Genre::Drama));
    assert_eq!(cached.age_rating, AgeRating::Fifteen);

    let second = crawler(Arc::clone(&catalog))
        .run(&channels(&["KBS2[7]"]), reloaded.snapshot())
        .await;

    assert_eq!(second.summary.cache_hits, 3);
    assert_eq!(second.summary.resolutions, 0);
    assert_eq!(catalog.searches.load(Ordering::SeqCst), searches_after_first);
    assert_eq!(
        find(&second.rows, "사랑의 이해").subgenre,
        find(&first.rows, "사랑의 이해").subgenre
    );
}

#[tokio::test]
async fn test_run_without_data_refuses_to_write() {
    let temp_dir = TempDir::new().unwrap();
    let writer = CatalogWriter::new(temp_dir.path());

    let result = crawler(Arc::new(OneDramaCatalog::default()))
        .run(&channels(&["UNKNOWN[1]", "UNKNOWN[2]"]), Arc::new(HashMap::new()))
        .await;
    assert_eq!(result.summary.channels_failed, 2);

    let mut rows = result.rows;
    let err = writer.write_daily(run_date(), &mut rows).await.unwrap_err();
    assert!(matches!(err, CatalogError::NoCollectedData));
    assert!(!writer.daily_path(run_date()).exists());
}
