use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use runtime::{LivenessToken, PeriodicTask, spawn_periodic};
use tokio::sync::RwLock;

use crate::client::{Article, FeedClient, fallback_articles};

/// Headlines refreshed on a fixed interval for as long as the owning mount
/// lives. Starts out showing the fallback list.
#[derive(Debug)]
pub struct Ticker {
    articles: Arc<RwLock<Vec<Article>>>,
    refreshes: Arc<AtomicU64>,
    task: PeriodicTask,
}

impl Ticker {
    pub fn start(client: FeedClient, period: Duration, token: LivenessToken) -> Self {
        let articles = Arc::new(RwLock::new(fallback_articles()));
        let refreshes = Arc::new(AtomicU64::new(0));

        let shared = Arc::clone(&articles);
        let count = Arc::clone(&refreshes);
        let task = spawn_periodic("news-ticker", period, token, move || {
            let client = client.clone();
            let shared = Arc::clone(&shared);
            let count = Arc::clone(&count);
            async move {
                let latest = client.fetch_or_fallback().await;
                *shared.write().await = latest;
                count.fetch_add(1, Ordering::Relaxed);
            }
        });

        tracing::info!(period_secs = period.as_secs_f64(), "news ticker started");
        Self {
            articles,
            refreshes,
            task,
        }
    }

    pub async fn articles(&self) -> Vec<Article> {
        self.articles.read().await.clone()
    }

    /// Completed refreshes, successful or not.
    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancels the refresh task and waits for it to exit.
    pub async fn stop(self) {
        self.task.cancel();
        self.task.join().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Ticker;
    use crate::client::tests::serve;
    use crate::client::{FeedClient, fallback_articles};
    use axum::Router;
    use axum::routing::get;
    use runtime::LivenessToken;

    async fn wait_for(ticker: &Ticker, refreshes: u64) {
        for _ in 0..200 {
            if ticker.refreshes() >= refreshes {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("ticker never reached {refreshes} refreshes");
    }

    #[tokio::test]
    async fn refreshes_until_token_is_revoked() {
        let app = Router::new().route(
            "/feed",
            get(|| async { r#"{"articles": [{"title": "Live headline"}]}"# }),
        );
        let base = serve(app).await;
        let token = LivenessToken::new();
        let client = FeedClient::new(reqwest::Client::new(), format!("{base}/feed"));

        let ticker = Ticker::start(client, Duration::from_millis(20), token.clone());
        assert_eq!(ticker.articles().await, fallback_articles());

        wait_for(&ticker, 2).await;
        let shown = ticker.articles().await;
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Live headline");

        token.revoke();
        for _ in 0..100 {
            if !ticker.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!ticker.is_running());
        let settled = ticker.refreshes();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(ticker.refreshes(), settled);
    }

    #[tokio::test]
    async fn failing_feed_keeps_fallback() {
        let client = FeedClient::new(reqwest::Client::new(), "http://127.0.0.1:9/feed")
            .with_timeout(Duration::from_millis(200));
        let ticker = Ticker::start(client, Duration::from_secs(60), LivenessToken::new());
        wait_for(&ticker, 1).await;
        assert_eq!(ticker.articles().await, fallback_articles());
        ticker.stop().await;
    }
}
