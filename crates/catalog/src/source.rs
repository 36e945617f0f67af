use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;

use crate::event::Event;
use crate::fixture::demo_events;
use crate::record::normalize_records;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalogue could not be fetched or was not a JSON array.
    Unavailable(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Unavailable(msg) => write!(f, "event catalogue unavailable: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// A provider of the session's event catalogue.
///
/// `load` is idempotent and has no side effects on failure. It never yields a
/// partial or malformed record: bad records are dropped during normalization,
/// and anything that prevents reading the collection as a whole is reported
/// as [`CatalogError::Unavailable`].
pub trait CatalogSource: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self) -> BoxFuture<'_, Result<Vec<Event>, CatalogError>>;
}

/// In-memory catalogue.
#[derive(Debug, Clone)]
pub struct FixtureCatalog {
    events: Vec<Event>,
}

impl FixtureCatalog {
    /// The built-in demo catalogue.
    pub fn demo() -> Self {
        Self {
            events: demo_events(),
        }
    }

    pub fn from_events(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Builds a fixture from raw JSON records, applying the same
    /// normalization as a remote feed.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let values = parse_array(text)?;
        Ok(Self {
            events: normalize_records(values),
        })
    }
}

impl CatalogSource for FixtureCatalog {
    fn name(&self) -> &str {
        "fixture"
    }

    fn load(&self) -> BoxFuture<'_, Result<Vec<Event>, CatalogError>> {
        Box::pin(async move { Ok(self.events.clone()) })
    }
}

fn parse_array(text: &str) -> Result<Vec<Value>, CatalogError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(values)) => Ok(values),
        Ok(other) => Err(CatalogError::Unavailable(format!(
            "expected a JSON array, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(CatalogError::Unavailable(format!("invalid JSON: {e}"))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Remote catalogue fetched with a single `GET`.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpCatalog {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<Event>, CatalogError> {
        let resp = self
            .http
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(format!("fetch failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::Unavailable(format!(
                "upstream HTTP {}",
                status.as_u16()
            )));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| CatalogError::Unavailable(format!("read failed: {e}")))?;

        let values = parse_array(&text)?;
        Ok(normalize_records(values))
    }
}

impl CatalogSource for HttpCatalog {
    fn name(&self) -> &str {
        &self.url
    }

    fn load(&self) -> BoxFuture<'_, Result<Vec<Event>, CatalogError>> {
        Box::pin(self.fetch())
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogError, CatalogSource, FixtureCatalog, HttpCatalog};
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn demo_fixture_loads_every_time() {
        let source = FixtureCatalog::demo();
        let first = source.load().await.expect("load");
        let second = source.load().await.expect("load");
        assert_eq!(first, second);
        assert_eq!(first.len(), 9);
    }

    #[test]
    fn fixture_from_json_requires_an_array() {
        let err = FixtureCatalog::from_json(r#"{"events": []}"#).unwrap_err();
        assert!(matches!(err, CatalogError::Unavailable(_)));
    }

    #[tokio::test]
    async fn http_catalog_drops_bad_records() {
        let app = Router::new().route(
            "/events",
            get(|| async {
                r#"[
                    {"id": "a", "category": "shipping", "kind": "VESSEL", "lat": 4.5, "lng": 7.0, "title": "MAERSK LAGOS"},
                    {"id": "b", "category": "shipping"}
                ]"#
            }),
        );
        let base = serve(app).await;

        let source = HttpCatalog::new(reqwest::Client::new(), format!("{base}/events"));
        let events = source.load().await.expect("load");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "a");
    }

    #[tokio::test]
    async fn http_catalog_rejects_error_status() {
        let app = Router::new().route(
            "/events",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let base = serve(app).await;

        let source = HttpCatalog::new(reqwest::Client::new(), format!("{base}/events"));
        let err = source.load().await.unwrap_err();
        assert_eq!(err, CatalogError::Unavailable("upstream HTTP 503".to_string()));
    }

    #[tokio::test]
    async fn http_catalog_rejects_non_array_body() {
        let app = Router::new().route("/events", get(|| async { r#"{"oops": true}"# }));
        let base = serve(app).await;

        let source = HttpCatalog::new(reqwest::Client::new(), format!("{base}/events"));
        assert!(source.load().await.is_err());
    }
}
