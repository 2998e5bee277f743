//! HTTP session that reads the channel guide and the web search pages.

use async_trait::async_trait;
use scraper::Html;
use std::time::Duration;
use tracing::{debug, info};

use super::{ChannelGuide, SecondaryHit, SecondarySearch, Session, SessionFactory};
use crate::config::SearchConfig;
use crate::error::{SourceError, SourceResult};
use crate::model::RawRow;
use crate::schedule::guide::selector;
use crate::schedule::{clean_query_title, clean_title, parse_guide_rows};

const GENRE_SELECTOR: &str = "div.sub_title span";
const THUMBNAIL_SELECTOR: &str = r#"#main_pack div[class*="_broadcast_button_scroller"] div.cm_content_wrap._broadcast_normal_total > div:nth-child(1) div.detail_info a img"#;
const CAST_SELECTOR: &str = "#main_pack > div.sc_new._kgs_broadcast.cs_common_module._broadcast_button_scroller.case_normal.color_13 > div.cm_content_wrap._broadcast_normal_total > div > div.list_image_info._content > ul > li > div > div > span > a";
const CAST_BACKUP_SELECTOR: &str = "#main_pack div.cm_content_wrap._broadcast_normal_total ul li div div strong a";

/// Genre label and thumbnail from a `<title> 정보` result page
pub fn parse_genre_and_thumbnail(html: &str) -> SourceResult<SecondaryHit> {
    let document = Html::parse_document(html);

    let genre_label = document
        .select(&selector(GENRE_SELECTOR)?)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let thumbnail = document
        .select(&selector(THUMBNAIL_SELECTOR)?)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| src.trim().to_string())
        .unwrap_or_default();

    Ok(SecondaryHit { genre_label, thumbnail })
}

/// Cast names from a `<title> 출연진` result page, primary layout first
pub fn parse_cast(html: &str, max_names: usize) -> SourceResult<Vec<String>> {
    let document = Html::parse_document(html);

    for css in [CAST_SELECTOR, CAST_BACKUP_SELECTOR] {
        let names: Vec<String> = document
            .select(&selector(css)?)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|name| !name.is_empty())
            .take(max_names)
            .collect();
        if !names.is_empty() {
            return Ok(names);
        }
    }
    Ok(Vec::new())
}

fn info_query(title: &str) -> String {
    format!("{} 정보", clean_title(title))
}

fn cast_query(title: &str) -> String {
    format!("{} 출연진", clean_query_title(title))
}

/// Cookie-carrying HTTP session owned by one crawl task
pub struct HttpSession {
    client: reqwest::Client,
    config: SearchConfig,
    guide_timeout: Duration,
    closed: bool,
}

impl HttpSession {
    pub fn new(config: SearchConfig, guide_timeout: Duration) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            guide_timeout,
            closed: false,
        })
    }

    fn ensure_open(&self) -> SourceResult<()> {
        if self.closed {
            Err(SourceError::Unavailable("session already closed".to_string()))
        } else {
            Ok(())
        }
    }

    async fn fetch_page(&self, request: reqwest::RequestBuilder) -> SourceResult<String> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.text().await?)
    }

    async fn search_page(&self, query: &str) -> SourceResult<String> {
        self.ensure_open()?;
        debug!("🔎 Web search: {}", query);
        let request = self.client.get(&self.config.search_url).query(&[("query", query)]);
        self.fetch_page(request).await
    }
}

#[async_trait]
impl ChannelGuide for HttpSession {
    async fn fetch_rows(&mut self, channel: &str) -> SourceResult<Vec<RawRow>> {
        self.ensure_open()?;
        let request = self
            .client
            .get(&self.config.guide_url)
            .query(&[("channel", channel)])
            .timeout(self.guide_timeout);

        let html = self.fetch_page(request).await?;
        parse_guide_rows(&html)
    }
}

#[async_trait]
impl SecondarySearch for HttpSession {
    async fn lookup_genre_and_thumbnail(&mut self, title: &str) -> SourceResult<SecondaryHit> {
        let html = self.search_page(&info_query(title)).await?;
        parse_genre_and_thumbnail(&html)
    }

    async fn lookup_cast(&mut self, title: &str) -> SourceResult<Vec<String>> {
        let html = self.search_page(&cast_query(title)).await?;
        parse_cast(&html, self.config.max_cast)
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn close(&mut self) -> SourceResult<()> {
        self.closed = true;
        Ok(())
    }
}

/// Opens an [`HttpSession`] per channel
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    config: SearchConfig,
    guide_timeout: Duration,
}

impl HttpSessionFactory {
    pub fn new(config: SearchConfig, guide_timeout: Duration) -> Self {
        Self { config, guide_timeout }
    }
}

#[async_trait]
impl SessionFactory for HttpSessionFactory {
    async fn open(&self, channel: &str) -> SourceResult<Box<dyn Session>> {
        let session = HttpSession::new(self.config.clone(), self.guide_timeout)?;
        info!("🌐 Session opened for {}", channel);
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_genre_and_thumbnail() {
        let html = r##"
            <div id="main_pack">
              <div class="sub_title"><span>시사/교양</span><span>KBS1</span></div>
              <div class="sc_new _broadcast_button_scroller">
                <div class="cm_content_wrap _broadcast_normal_total">
                  <div><div class="detail_info"><a href="#"><img src="https://img.example/poster.jpg"></a></div></div>
                  <div><div class="detail_info"><a href="#"><img src="https://img.example/other.jpg"></a></div></div>
                </div>
              </div>
            </div>"##;

        let hit = parse_genre_and_thumbnail(html).unwrap();
        assert_eq!(hit.genre_label, "시사/교양");
        assert_eq!(hit.thumbnail, "https://img.example/poster.jpg");
    }

    #[test]
    fn test_parse_genre_and_thumbnail_missing_elements() {
        let hit = parse_genre_and_thumbnail("<html><body></body></html>").unwrap();
        assert_eq!(hit, SecondaryHit::default());
    }

    #[test]
    fn test_parse_cast_falls_back_to_backup_layout() {
        let names: Vec<String> = (1..=7).map(|i| format!("<li><div><div><strong><a>배우{}</a></strong></div></div></li>", i)).collect();
        let html = format!(
            r#"<div id="main_pack"><div class="cm_content_wrap _broadcast_normal_total"><ul>{}</ul></div></div>"#,
            names.join("")
        );

        let cast = parse_cast(&html, 5).unwrap();
        assert_eq!(cast, vec!["배우1", "배우2", "배우3", "배우4", "배우5"]);
    }

    #[test]
    fn test_search_queries() {
        assert_eq!(info_query("[HD] 인간극장 (재)"), "인간극장 정보");
        assert_eq!(cast_query("닥터 차정숙: 스페셜"), "닥터 차정숙 스페셜 출연진");
    }

    #[test]
    fn test_parse_cast_empty_page() {
        assert!(parse_cast("<html></html>", 5).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_session_rejects_calls() {
        let mut session = HttpSession::new(SearchConfig::default(), Duration::from_secs(1)).unwrap();
        session.close().await.unwrap();

        let result = session.lookup_cast("인간극장").await;
        assert!(matches!(result, Err(SourceError::Unavailable(_))));
    }
}
