use catalog::{Event, EventCategory};
use engine::{EngineError, EngineFactory, Fog, MapEngine, MapOptions};
use foundation::{Camera, Projection};
use layers::{LayerSynchronizer, SyncReport, VisibilitySelection};
use runtime::LivenessToken;

use crate::icons::{IconAtlas, IconOutcome, IconReport};
use crate::style::{DEFAULT_STYLE_URL, globe_fog, hide_base_point_layers, initial_camera};

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    pub access_token: Option<String>,
    pub style_url: String,
    pub camera: Camera,
    pub fog: Fog,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            style_url: DEFAULT_STYLE_URL.to_string(),
            camera: initial_camera(),
            fog: globe_fog(),
        }
    }
}

impl SurfaceConfig {
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// A required setting (the engine access token) is absent.
    ConfigMissing(&'static str),
    Engine(EngineError),
}

impl std::fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceError::ConfigMissing(what) => write!(f, "missing configuration: {what}"),
            SurfaceError::Engine(err) => write!(f, "engine error: {err}"),
        }
    }
}

impl std::error::Error for SurfaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SurfaceError::Engine(err) => Some(err),
            SurfaceError::ConfigMissing(_) => None,
        }
    }
}

impl From<EngineError> for SurfaceError {
    fn from(err: EngineError) -> Self {
        SurfaceError::Engine(err)
    }
}

struct Mount<E> {
    engine: E,
    token: LivenessToken,
    ready: bool,
    /// False while the catalogue is unavailable: no layers exist yet.
    layers_built: bool,
    sync: LayerSynchronizer,
}

/// Owns the single engine instance bound to a view.
///
/// `init` creates the engine (at most one live instance), `on_style_ready`
/// builds the overlay, `teardown` releases everything and revokes the mount's
/// [`LivenessToken`]. Every mutating entry point is a no-op without a live
/// mount, so late callers cannot touch a released engine.
pub struct MapSurfaceController<F: EngineFactory> {
    factory: F,
    config: SurfaceConfig,
    mount: Option<Mount<F::Engine>>,
}

impl<F: EngineFactory> MapSurfaceController<F> {
    pub fn new(factory: F, config: SurfaceConfig) -> Self {
        Self {
            factory,
            config,
            mount: None,
        }
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Creates and configures the engine. A second call while live returns
    /// the current mount's token without creating anything.
    pub fn init(&mut self) -> Result<LivenessToken, SurfaceError> {
        if let Some(mount) = &self.mount {
            tracing::debug!("map surface already mounted");
            return Ok(mount.token.clone());
        }

        let Some(access_token) = self
            .config
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
        else {
            tracing::error!("map access token is not configured; overlay disabled");
            return Err(SurfaceError::ConfigMissing("access token"));
        };

        let options = MapOptions {
            access_token,
            style_url: self.config.style_url.clone(),
            camera: self.config.camera,
            projection: Projection::Globe,
        };
        let mut engine = self.factory.create(&options)?;
        engine.set_projection(Projection::Globe)?;
        engine.jump_to(self.config.camera)?;
        engine.set_fog(self.config.fog.clone())?;

        let token = LivenessToken::new();
        self.mount = Some(Mount {
            engine,
            token: token.clone(),
            ready: false,
            layers_built: false,
            sync: LayerSynchronizer::new(),
        });
        tracing::info!(style = %self.config.style_url, "map surface mounted");
        Ok(token)
    }

    pub fn is_live(&self) -> bool {
        self.mount.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.mount.as_ref().is_some_and(|m| m.ready)
    }

    pub fn has_layers(&self) -> bool {
        self.mount.as_ref().is_some_and(|m| m.layers_built)
    }

    pub fn token(&self) -> Option<&LivenessToken> {
        self.mount.as_ref().map(|m| &m.token)
    }

    /// True if `token` belongs to the current, still-live mount.
    pub fn accepts(&self, token: &LivenessToken) -> bool {
        self.mount
            .as_ref()
            .is_some_and(|m| token.is_alive() && m.token.same_mount(token))
    }

    pub fn engine(&self) -> Option<&F::Engine> {
        self.mount.as_ref().map(|m| &m.engine)
    }

    pub fn engine_mut(&mut self) -> Option<&mut F::Engine> {
        self.mount.as_mut().map(|m| &mut m.engine)
    }

    /// Style finished loading: hide competing base-map points, mark ready and
    /// build the overlay from `catalogue`. `None` means the catalogue is
    /// unavailable; no layers are created until a later
    /// [`Self::refresh_catalog`].
    pub fn on_style_ready(
        &mut self,
        catalogue: Option<&[Event]>,
        selection: &VisibilitySelection,
    ) -> Result<Option<SyncReport>, SurfaceError> {
        let Some(mount) = self.mount.as_mut() else {
            return Ok(None);
        };

        hide_base_point_layers(&mut mount.engine)?;
        mount.ready = true;

        let Some(events) = catalogue else {
            tracing::warn!("style ready without a catalogue; overlay left empty");
            return Ok(None);
        };
        let report = mount.sync.sync(&mut mount.engine, events, selection)?;
        mount.layers_built = true;
        tracing::info!(
            events = events.len(),
            layers = report.created.len(),
            "overlay layers built"
        );
        Ok(Some(report))
    }

    /// Replaces the catalogue. Before the style is ready this is deferred to
    /// `on_style_ready`.
    pub fn refresh_catalog(
        &mut self,
        events: &[Event],
        selection: &VisibilitySelection,
    ) -> Result<Option<SyncReport>, SurfaceError> {
        let Some(mount) = self.mount.as_mut().filter(|m| m.ready) else {
            return Ok(None);
        };
        let report = mount.sync.sync(&mut mount.engine, events, selection)?;
        mount.layers_built = true;
        Ok(Some(report))
    }

    pub fn apply_visibility(
        &mut self,
        selection: &VisibilitySelection,
    ) -> Result<Vec<EventCategory>, SurfaceError> {
        let Some(mount) = self.mount.as_mut().filter(|m| m.layers_built) else {
            return Ok(Vec::new());
        };
        Ok(mount.sync.apply_visibility(&mut mount.engine, selection)?)
    }

    /// Applies settled icon fetches if `token` is still the live mount;
    /// otherwise the outcomes are dropped and `None` is returned.
    pub fn register_icons(
        &mut self,
        token: &LivenessToken,
        outcomes: Vec<IconOutcome>,
    ) -> Result<Option<IconReport>, SurfaceError> {
        if !self.accepts(token) {
            tracing::debug!("discarding icon results for a released mount");
            return Ok(None);
        }
        let Some(mount) = self.mount.as_mut() else {
            return Ok(None);
        };
        let report = IconAtlas::register(&mut mount.engine, outcomes)?;
        if mount.layers_built && !report.registered.is_empty() {
            mount.sync.refresh_paint(&mut mount.engine)?;
        }
        Ok(Some(report))
    }

    /// Releases the engine and revokes the mount. Returns false if nothing was
    /// mounted.
    pub fn teardown(&mut self) -> bool {
        let Some(mut mount) = self.mount.take() else {
            return false;
        };
        mount.token.revoke();
        mount.engine.remove();
        tracing::info!("map surface torn down");
        true
    }
}

impl<F: EngineFactory> Drop for MapSurfaceController<F> {
    fn drop(&mut self) {
        self.teardown();
    }
}
