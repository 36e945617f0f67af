use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use catalog::{BoxFuture, EventCategory};
use engine::{EngineError, GlyphImage, MapEngine};
use futures_util::future::join_all;
use image::imageops::FilterType;
use layers::style_for;

/// Edge length of registered glyphs, in pixels.
pub const GLYPH_SIZE_PX: u32 = 64;

/// Why a category ended up without a glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLoadFailed {
    pub category: EventCategory,
    pub asset: String,
    pub reason: String,
}

impl std::fmt::Display for AssetLoadFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "icon {} for {} failed to load: {}",
            self.asset, self.category, self.reason
        )
    }
}

impl std::error::Error for AssetLoadFailed {}

/// Settled result of loading one category's glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct IconOutcome {
    pub category: EventCategory,
    pub result: Result<GlyphImage, AssetLoadFailed>,
}

/// Categories registered and failed by one [`IconAtlas::register`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconReport {
    pub registered: Vec<EventCategory>,
    pub failed: Vec<EventCategory>,
}

/// Reads raw icon bytes by asset file name.
pub trait AssetFetcher: Send + Sync {
    fn fetch<'a>(&'a self, file: &'a str) -> BoxFuture<'a, Result<Vec<u8>, String>>;
}

/// Icons stored under a directory on disk.
#[derive(Debug, Clone)]
pub struct FsAssetFetcher {
    root: PathBuf,
}

impl FsAssetFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetFetcher for FsAssetFetcher {
    fn fetch<'a>(&'a self, file: &'a str) -> BoxFuture<'a, Result<Vec<u8>, String>> {
        Box::pin(async move {
            let path = self.root.join(file);
            tokio::fs::read(&path)
                .await
                .map_err(|e| format!("{}: {e}", path.display()))
        })
    }
}

/// Icons served under an HTTP base URL.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpAssetFetcher {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    async fn get(&self, file: &str) -> Result<Vec<u8>, String> {
        let url = format!("{}/{}", self.base_url, file);
        let resp = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| format!("fetch failed: {e}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("upstream HTTP {}", status.as_u16()));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| format!("read failed: {e}"))?;
        Ok(bytes.to_vec())
    }
}

impl AssetFetcher for HttpAssetFetcher {
    fn fetch<'a>(&'a self, file: &'a str) -> BoxFuture<'a, Result<Vec<u8>, String>> {
        Box::pin(self.get(file))
    }
}

/// Icons held in memory, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetFetcher {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssetFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.files.insert(file.into(), bytes);
        self
    }
}

impl AssetFetcher for MemoryAssetFetcher {
    fn fetch<'a>(&'a self, file: &'a str) -> BoxFuture<'a, Result<Vec<u8>, String>> {
        let found = self
            .files
            .get(file)
            .cloned()
            .ok_or_else(|| format!("{file}: not found"));
        Box::pin(async move { found })
    }
}

/// Picks the fetcher for an icon root: `http(s)://` bases go over the
/// network, anything else is a directory.
pub fn fetcher_for_root(http: reqwest::Client, root: &str) -> Arc<dyn AssetFetcher> {
    if root.starts_with("http://") || root.starts_with("https://") {
        Arc::new(HttpAssetFetcher::new(http, root))
    } else {
        Arc::new(FsAssetFetcher::new(root))
    }
}

/// Decodes an icon into a single-channel glyph: resized to
/// [`GLYPH_SIZE_PX`] square, keeping only coverage (alpha).
pub fn decode_glyph(bytes: &[u8]) -> Result<GlyphImage, String> {
    let decoded = image::load_from_memory(bytes).map_err(|e| format!("decode failed: {e}"))?;
    let rgba = decoded
        .resize_exact(GLYPH_SIZE_PX, GLYPH_SIZE_PX, FilterType::Triangle)
        .to_rgba8();
    let alpha = rgba.pixels().map(|p| p.0[3]).collect();
    GlyphImage::new(GLYPH_SIZE_PX, GLYPH_SIZE_PX, alpha).map_err(|e| e.to_string())
}

/// Loads one glyph per category into an engine's image registry.
#[derive(Clone)]
pub struct IconAtlas {
    fetcher: Arc<dyn AssetFetcher>,
}

impl std::fmt::Debug for IconAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconAtlas").finish_non_exhaustive()
    }
}

impl IconAtlas {
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self { fetcher }
    }

    /// Categories whose glyph is not yet in the engine's registry.
    pub fn pending<E: MapEngine + ?Sized>(
        engine: &E,
        categories: &[EventCategory],
    ) -> Vec<EventCategory> {
        categories
            .iter()
            .copied()
            .filter(|c| !engine.has_image(style_for(*c).icon_name))
            .collect()
    }

    /// Fetches and decodes every category in parallel. Never touches an
    /// engine; resolves once every category has settled.
    pub async fn fetch(&self, categories: Vec<EventCategory>) -> Vec<IconOutcome> {
        join_all(categories.into_iter().map(|c| self.fetch_one(c))).await
    }

    async fn fetch_one(&self, category: EventCategory) -> IconOutcome {
        let asset = style_for(category).icon_file;
        let result = match self.fetcher.fetch(asset).await {
            Ok(bytes) => decode_glyph(&bytes),
            Err(reason) => Err(reason),
        }
        .map_err(|reason| AssetLoadFailed {
            category,
            asset: asset.to_string(),
            reason,
        });

        if let Err(err) = &result {
            tracing::warn!(%category, error = %err, "icon unavailable");
        }
        IconOutcome { category, result }
    }

    /// Registers fetched glyphs. Categories already present are skipped, so
    /// each glyph lands at most once per engine instance.
    pub fn register<E: MapEngine + ?Sized>(
        engine: &mut E,
        outcomes: Vec<IconOutcome>,
    ) -> Result<IconReport, EngineError> {
        let mut report = IconReport::default();
        for outcome in outcomes {
            let name = style_for(outcome.category).icon_name;
            match outcome.result {
                Ok(glyph) => {
                    if !engine.has_image(name) {
                        engine.add_image(name, glyph)?;
                        report.registered.push(outcome.category);
                    }
                }
                Err(_) => report.failed.push(outcome.category),
            }
        }
        tracing::debug!(
            registered = report.registered.len(),
            failed = report.failed.len(),
            "icons registered"
        );
        Ok(report)
    }

    /// Fetch and register in one go, for callers that own the engine across
    /// the await.
    pub async fn ensure_loaded<E: MapEngine + ?Sized>(
        &self,
        engine: &mut E,
        categories: &[EventCategory],
    ) -> Result<IconReport, EngineError> {
        let pending = Self::pending(engine, categories);
        if pending.is_empty() {
            return Ok(IconReport::default());
        }
        let outcomes = self.fetch(pending).await;
        Self::register(engine, outcomes)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use super::{
        AssetFetcher, FsAssetFetcher, GLYPH_SIZE_PX, HttpAssetFetcher, IconAtlas,
        MemoryAssetFetcher, decode_glyph,
    };
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use catalog::EventCategory;
    use engine::{HeadlessEngine, MapEngine, MapOptions, Mutation};
    use foundation::{Camera, Projection};
    use layers::CATEGORY_STYLES;
    use pretty_assertions::assert_eq;

    pub(crate) fn png_bytes() -> Vec<u8> {
        let mut img = image::RgbaImage::new(8, 8);
        for (x, _, px) in img.enumerate_pixels_mut() {
            *px = image::Rgba([255, 255, 255, if x < 4 { 255 } else { 0 }]);
        }
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    /// Every category's asset except those in `missing`.
    pub(crate) fn assets_without(missing: &[EventCategory]) -> MemoryAssetFetcher {
        CATEGORY_STYLES
            .iter()
            .filter(|s| !missing.contains(&s.category))
            .fold(MemoryAssetFetcher::new(), |f, s| {
                f.with_file(s.icon_file, png_bytes())
            })
    }

    fn engine() -> HeadlessEngine {
        HeadlessEngine::new(MapOptions {
            access_token: "pk.test".to_string(),
            style_url: "mapbox://styles/mapbox/dark-v11".to_string(),
            camera: Camera::default(),
            projection: Projection::Globe,
        })
    }

    #[test]
    fn decodes_to_alpha_glyph() {
        let glyph = decode_glyph(&png_bytes()).unwrap();
        assert_eq!((glyph.width, glyph.height), (GLYPH_SIZE_PX, GLYPH_SIZE_PX));
        assert_eq!(glyph.alpha.len(), (GLYPH_SIZE_PX * GLYPH_SIZE_PX) as usize);
        assert_eq!(glyph.alpha[0], 255);
        assert_eq!(glyph.alpha[GLYPH_SIZE_PX as usize - 1], 0);
    }

    #[test]
    fn rejects_non_images() {
        assert!(decode_glyph(b"not a png").is_err());
    }

    #[tokio::test]
    async fn partial_failure_still_settles_every_category() {
        let atlas = IconAtlas::new(Arc::new(assets_without(&[EventCategory::Air])));
        let outcomes = atlas.fetch(EventCategory::ALL.to_vec()).await;
        assert_eq!(outcomes.len(), EventCategory::COUNT);

        let failed: Vec<_> = outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.category)
            .collect();
        assert_eq!(failed, vec![EventCategory::Air]);
    }

    #[tokio::test]
    async fn registers_each_glyph_once_per_engine() {
        let atlas = IconAtlas::new(Arc::new(assets_without(&[])));
        let mut engine = engine();

        let report = atlas
            .ensure_loaded(&mut engine, &EventCategory::ALL)
            .await
            .unwrap();
        assert_eq!(report.registered.len(), EventCategory::COUNT);
        let images = engine
            .mutations()
            .iter()
            .filter(|m| matches!(m, Mutation::AddImage(_)))
            .count();
        assert_eq!(images, EventCategory::COUNT);

        let again = atlas
            .ensure_loaded(&mut engine, &EventCategory::ALL)
            .await
            .unwrap();
        assert!(again.registered.is_empty());
        assert!(engine.has_image("protocol-air"));
    }

    #[test]
    fn register_skips_categories_already_present() {
        let mut engine = engine();
        let glyph = decode_glyph(&png_bytes()).unwrap();
        engine.add_image("protocol-conflict", glyph.clone()).unwrap();

        let outcomes = vec![super::IconOutcome {
            category: EventCategory::Conflict,
            result: Ok(glyph),
        }];
        let report = IconAtlas::register(&mut engine, outcomes).unwrap();
        assert!(report.registered.is_empty());
        assert!(IconAtlas::pending(&engine, &[EventCategory::Conflict]).is_empty());
    }

    #[tokio::test]
    async fn filesystem_fetcher_reports_missing_files() {
        let dir = std::env::temp_dir().join(format!("protocol-icons-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("icon-air.png"), png_bytes())
            .await
            .unwrap();

        let fetcher = FsAssetFetcher::new(dir.clone());
        assert!(fetcher.fetch("icon-air.png").await.is_ok());
        let err = fetcher.fetch("icon-culture.png").await.unwrap_err();
        assert!(err.contains("icon-culture.png"));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn bundled_assets_decode() {
        let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/protocol");
        let atlas = IconAtlas::new(Arc::new(FsAssetFetcher::new(root)));
        let outcomes = atlas.fetch(EventCategory::ALL.to_vec()).await;
        for outcome in &outcomes {
            assert!(outcome.result.is_ok(), "{:?}", outcome.result);
        }
    }

    #[tokio::test]
    async fn http_fetcher_treats_error_status_as_failure() {
        let app = Router::new()
            .route("/icons/icon-air.png", get(|| async { png_bytes() }))
            .route(
                "/icons/icon-infra.png",
                get(|| async { (StatusCode::NOT_FOUND, "missing") }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let fetcher = HttpAssetFetcher::new(reqwest::Client::new(), format!("http://{addr}/icons/"));
        assert_eq!(fetcher.fetch("icon-air.png").await.unwrap(), png_bytes());
        assert_eq!(
            fetcher.fetch("icon-infra.png").await.unwrap_err(),
            "upstream HTTP 404"
        );
    }
}
