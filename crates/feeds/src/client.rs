use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

impl Article {
    fn headline(title: &str, source: &str) -> Self {
        Self {
            title: title.to_string(),
            url: None,
            source: Some(source.to_string()),
            published_at: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeedPayload {
    articles: Vec<Article>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    Unavailable(String),
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Unavailable(msg) => write!(f, "news feed unavailable: {msg}"),
        }
    }
}

impl std::error::Error for FeedError {}

/// Static ticker content shown whenever the feed cannot be read.
pub fn fallback_articles() -> Vec<Article> {
    vec![
        Article::headline("Gulf of Guinea shipping lanes report elevated piracy risk", "Protocol Desk"),
        Article::headline("Regional carriers expand West African air corridors", "Protocol Desk"),
        Article::headline("Port workers in Tema weigh extended strike action", "Protocol Desk"),
        Article::headline("Lagos–Abidjan highway works enter second phase", "Protocol Desk"),
        Article::headline("Dakar cultural festival draws record attendance", "Protocol Desk"),
    ]
}

/// Reads `{articles: [...]}` from the auxiliary news endpoint.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl FeedClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<Vec<Article>, FeedError> {
        let resp = self
            .http
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FeedError::Unavailable(format!("fetch failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Unavailable(format!(
                "upstream HTTP {}",
                status.as_u16()
            )));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| FeedError::Unavailable(format!("read failed: {e}")))?;
        let payload: FeedPayload = serde_json::from_str(&text)
            .map_err(|e| FeedError::Unavailable(format!("malformed body: {e}")))?;
        if payload.articles.is_empty() {
            return Err(FeedError::Unavailable("no articles".to_string()));
        }
        Ok(payload.articles)
    }

    /// Never fails: any feed error yields [`fallback_articles`].
    pub async fn fetch_or_fallback(&self) -> Vec<Article> {
        match self.fetch().await {
            Ok(articles) => articles,
            Err(err) => {
                tracing::warn!(url = %self.url, error = %err, "using fallback headlines");
                fallback_articles()
            }
        }
    }
}
