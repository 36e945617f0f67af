use std::sync::Arc;

use catalog::{CatalogError, CatalogSource, Event, EventCategory, count_by_category};
use engine::EngineFactory;
use layers::VisibilitySelection;
use runtime::LivenessToken;
use tokio::sync::mpsc;

use crate::controller::{MapSurfaceController, SurfaceConfig, SurfaceError};
use crate::dispatcher::{FocusedEvent, InteractionDispatcher, PointerEvent, Transition};
use crate::icons::{IconAtlas, IconOutcome};

/// Everything the session reacts to, from the host or from its own fetches.
#[derive(Debug)]
pub enum SessionMessage {
    StyleLoaded,
    IconsSettled {
        token: LivenessToken,
        outcomes: Vec<IconOutcome>,
    },
    /// `request` orders loads within a session; older answers are dropped.
    CatalogSettled {
        token: LivenessToken,
        request: u64,
        result: Result<Vec<Event>, CatalogError>,
    },
    ReloadCatalog,
    Pointer(PointerEvent),
    SetVisibility(EventCategory, bool),
    Toggle(EventCategory),
    Teardown,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stopped,
}

/// First paint waits for the style, the glyphs and the catalogue to settle.
#[derive(Debug, Default, Clone, Copy)]
struct MountGate {
    style: bool,
    icons: bool,
    catalog: bool,
}

impl MountGate {
    fn open(&self) -> bool {
        self.style && self.icons && self.catalog
    }
}

/// Host-side loop wiring the controller, the icon atlas, the catalogue and
/// the interaction dispatcher.
///
/// Engine mutation only happens inside [`OverlaySession::handle`], on the
/// task that owns the session. Fetches run on spawned tasks and report back
/// through the session's channel tagged with the mount's token; results for a
/// released mount are dropped.
pub struct OverlaySession<F: EngineFactory> {
    controller: MapSurfaceController<F>,
    dispatcher: InteractionDispatcher,
    catalog: Arc<dyn CatalogSource>,
    atlas: IconAtlas,
    selection: VisibilitySelection,
    catalogue: Option<Vec<Event>>,
    gate: MountGate,
    catalog_requests: u64,
    catalog_applied: Option<u64>,
    transitions: Vec<Transition>,
    tx: mpsc::UnboundedSender<SessionMessage>,
    rx: mpsc::UnboundedReceiver<SessionMessage>,
}

impl<F: EngineFactory> OverlaySession<F> {
    pub fn new(
        factory: F,
        config: SurfaceConfig,
        catalog: Arc<dyn CatalogSource>,
        atlas: IconAtlas,
        selection: VisibilitySelection,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            controller: MapSurfaceController::new(factory, config),
            dispatcher: InteractionDispatcher::new(),
            catalog,
            atlas,
            selection,
            catalogue: None,
            gate: MountGate::default(),
            catalog_requests: 0,
            catalog_applied: None,
            transitions: Vec::new(),
            tx,
            rx,
        }
    }

    /// Channel for host input.
    pub fn sender(&self) -> mpsc::UnboundedSender<SessionMessage> {
        self.tx.clone()
    }

    pub fn controller(&self) -> &MapSurfaceController<F> {
        &self.controller
    }

    pub fn selection(&self) -> &VisibilitySelection {
        &self.selection
    }

    pub fn catalogue(&self) -> &[Event] {
        self.catalogue.as_deref().unwrap_or(&[])
    }

    pub fn focused(&self) -> Option<&FocusedEvent> {
        self.dispatcher.focused()
    }

    /// Interaction transitions observed so far, oldest first.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Creates the engine and starts the icon and catalogue fetches.
    pub fn mount(&mut self) -> Result<LivenessToken, SurfaceError> {
        if let Some(token) = self.controller.token() {
            return Ok(token.clone());
        }
        let token = self.controller.init()?;
        self.gate = MountGate::default();

        let pending = match self.controller.engine() {
            Some(engine) => IconAtlas::pending(engine, &EventCategory::ALL),
            None => Vec::new(),
        };
        self.spawn_icons(token.clone(), pending);
        self.spawn_catalog(token.clone());
        Ok(token)
    }

    fn spawn_icons(&self, token: LivenessToken, pending: Vec<EventCategory>) {
        let atlas = self.atlas.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let guard = token.clone();
            tokio::select! {
                biased;
                _ = guard.revoked() => {}
                outcomes = atlas.fetch(pending) => {
                    let _ = tx.send(SessionMessage::IconsSettled { token, outcomes });
                }
            }
        });
    }

    fn spawn_catalog(&mut self, token: LivenessToken) {
        self.catalog_requests += 1;
        let request = self.catalog_requests;
        let catalog = Arc::clone(&self.catalog);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let guard = token.clone();
            tokio::select! {
                biased;
                _ = guard.revoked() => {}
                result = catalog.load() => {
                    let _ = tx.send(SessionMessage::CatalogSettled {
                        token,
                        request,
                        result,
                    });
                }
            }
        });
    }

    /// Waits for and handles one message.
    pub async fn step(&mut self) -> Result<Flow, SurfaceError> {
        match self.rx.recv().await {
            Some(message) => self.handle(message),
            None => Ok(Flow::Stopped),
        }
    }

    /// Handles messages until the overlay has painted or the mount is gone.
    pub async fn run_until_ready(&mut self) -> Result<(), SurfaceError> {
        while self.controller.is_live() && !self.controller.is_ready() {
            if self.step().await? == Flow::Stopped {
                break;
            }
        }
        Ok(())
    }

    /// Handles everything already queued without waiting.
    pub fn drain(&mut self) -> Result<Flow, SurfaceError> {
        while let Ok(message) = self.rx.try_recv() {
            if self.handle(message)? == Flow::Stopped {
                return Ok(Flow::Stopped);
            }
        }
        Ok(Flow::Continue)
    }

    /// Main loop: runs until a `Teardown` message. Engine errors are logged
    /// and the loop keeps going.
    pub async fn run(&mut self) {
        loop {
            match self.step().await {
                Ok(Flow::Stopped) => break,
                Ok(Flow::Continue) => {}
                Err(err) => tracing::error!(error = %err, "overlay update failed"),
            }
        }
    }

    pub fn handle(&mut self, message: SessionMessage) -> Result<Flow, SurfaceError> {
        match message {
            SessionMessage::StyleLoaded => {
                if self.controller.is_live() {
                    self.gate.style = true;
                    self.try_first_paint()?;
                }
            }
            SessionMessage::IconsSettled { token, outcomes } => {
                if !self.controller.accepts(&token) {
                    tracing::debug!("dropping icon results from a released mount");
                    return Ok(Flow::Continue);
                }
                self.controller.register_icons(&token, outcomes)?;
                self.gate.icons = true;
                self.try_first_paint()?;
            }
            SessionMessage::CatalogSettled {
                token,
                request,
                result,
            } => {
                if !self.controller.accepts(&token) {
                    tracing::debug!("dropping catalogue from a released mount");
                    return Ok(Flow::Continue);
                }
                if self.catalog_applied.is_some_and(|applied| request <= applied) {
                    tracing::debug!(request, "dropping catalogue superseded by a newer load");
                    return Ok(Flow::Continue);
                }
                match result {
                    Ok(events) => {
                        tracing::info!(
                            source = self.catalog.name(),
                            events = events.len(),
                            per_category = ?count_by_category(&events),
                            "catalogue loaded"
                        );
                        self.controller.refresh_catalog(&events, &self.selection)?;
                        self.catalogue = Some(events);
                        self.catalog_applied = Some(request);
                    }
                    Err(err) => {
                        tracing::warn!(source = self.catalog.name(), error = %err, "catalogue unavailable");
                    }
                }
                self.gate.catalog = true;
                self.try_first_paint()?;
            }
            SessionMessage::ReloadCatalog => {
                if let Some(token) = self.controller.token().cloned() {
                    self.spawn_catalog(token);
                }
            }
            SessionMessage::Pointer(input) => {
                if !self.controller.is_ready() {
                    return Ok(Flow::Continue);
                }
                self.dispatcher.push(input);
                let catalogue = self.catalogue.as_deref().unwrap_or(&[]);
                if let Some(engine) = self.controller.engine_mut() {
                    let transitions = self.dispatcher.dispatch(engine, catalogue)?;
                    self.transitions.extend(transitions);
                }
            }
            SessionMessage::SetVisibility(category, visible) => {
                let mut next = self.selection;
                next.set(category, visible);
                self.select(next)?;
            }
            SessionMessage::Toggle(category) => {
                let mut next = self.selection;
                next.toggle(category);
                self.select(next)?;
            }
            SessionMessage::Teardown => {
                self.teardown();
                return Ok(Flow::Stopped);
            }
        }
        Ok(Flow::Continue)
    }

    /// Applies a new selection, then re-checks the hover so a symbol that
    /// just disappeared does not keep the pointer cursor.
    fn select(&mut self, next: VisibilitySelection) -> Result<(), SurfaceError> {
        let changed = next.changed_from(&self.selection);
        if changed.is_empty() {
            return Ok(());
        }
        tracing::debug!(?changed, "visibility changed");
        self.selection = next;
        self.controller.apply_visibility(&self.selection)?;
        if !self.controller.has_layers() {
            return Ok(());
        }
        let catalogue = self.catalogue.as_deref().unwrap_or(&[]);
        if let Some(engine) = self.controller.engine_mut() {
            if let Some(t) = self.dispatcher.refresh_hover(engine, catalogue)? {
                self.transitions.push(t);
            }
        }
        Ok(())
    }

    fn try_first_paint(&mut self) -> Result<(), SurfaceError> {
        if !self.gate.open() || self.controller.is_ready() {
            return Ok(());
        }
        self.controller
            .on_style_ready(self.catalogue.as_deref(), &self.selection)?;
        Ok(())
    }

    /// Releases the mount. Pending fetches observe the revoked token and stop.
    pub fn teardown(&mut self) {
        if self.controller.teardown() {
            self.dispatcher.reset();
            self.catalogue = None;
            self.catalog_applied = None;
            self.gate = MountGate::default();
        }
    }
}
