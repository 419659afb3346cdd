use crate::error::{Error, SyncResult};
use crate::ical::{CalendarEvent, IcalParser};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Content types requested from feed hosts
pub const ACCEPT_CALENDAR: &str = "text/calendar, application/calendar+json, text/plain";

/// Something that can produce raw feed text for a URL
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> SyncResult<String>;
}

/// Check that a feed URL parses and uses an http(s) scheme
pub fn validate_feed_url(url: &str) -> SyncResult<Url> {
    match Url::parse(url) {
        Ok(parsed) if parsed.scheme().starts_with("http") => Ok(parsed),
        _ => Err(Error::InvalidUrl(url.to_string())),
    }
}

/// Fetches feeds over HTTP
#[derive(Clone)]
pub struct HttpFeedFetcher {
    client: Client,
    user_agent: String,
}

impl HttpFeedFetcher {
    /// Create a fetcher whose requests give up after `timeout`
    pub fn new(user_agent: &str, timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> SyncResult<String> {
        let url = validate_feed_url(url)?;
        debug!("Fetching calendar feed from {}", url);

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, ACCEPT_CALENDAR)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::FetchStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.text().await?;
        info!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

/// Fetch a feed and parse its events
pub async fn fetch_and_parse(
    source: &dyn FeedSource,
    parser: &IcalParser,
    url: &str,
) -> SyncResult<Vec<CalendarEvent>> {
    let text = source.fetch(url).await?;
    Ok(parser.parse(&text))
}
