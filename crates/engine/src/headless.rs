use std::collections::BTreeMap;

use foundation::{Camera, Projection, ScreenPoint};

use crate::feature::FeatureCollection;
use crate::surface::{
    Cursor, EngineError, EngineFactory, Fog, GlyphImage, LayerDef, LayerPaint, MapEngine,
    MapOptions, Popup, RenderedFeature, StyleLayer, StyleLayerType,
};

/// Pixel size glyphs are rasterized at before `icon_size` scaling.
pub const GLYPH_PX: f64 = 64.0;

/// Engine calls that changed state, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Projection(Projection),
    Camera,
    Fog,
    AddSource(String),
    SetSourceData(String),
    AddLayer(String),
    SetLayerPaint(String),
    SetLayerVisibility(String, bool),
    RemoveLayer(String),
    AddImage(String),
    OpenPopup,
    ClosePopup,
    SetCursor(Cursor),
    Remove,
}

#[derive(Debug, Clone)]
struct BaseLayer {
    id: String,
    layer_type: StyleLayerType,
    visible: bool,
}

/// In-memory map engine.
///
/// Keeps sources, layers and images in plain collections, hit-tests with an
/// orthographic globe projection, and records every state change so callers
/// can assert on exactly what was mutated.
#[derive(Debug)]
pub struct HeadlessEngine {
    options: MapOptions,
    camera: Camera,
    projection: Projection,
    fog: Option<Fog>,
    base_layers: Vec<BaseLayer>,
    sources: BTreeMap<String, FeatureCollection>,
    layers: Vec<LayerDef>,
    images: BTreeMap<String, GlyphImage>,
    popup: Option<Popup>,
    cursor: Cursor,
    mutations: Vec<Mutation>,
    removed: bool,
}

impl HeadlessEngine {
    pub fn new(options: MapOptions) -> Self {
        Self {
            camera: options.camera,
            projection: options.projection,
            options,
            fog: None,
            base_layers: Vec::new(),
            sources: BTreeMap::new(),
            layers: Vec::new(),
            images: BTreeMap::new(),
            popup: None,
            cursor: Cursor::Default,
            mutations: Vec::new(),
            removed: false,
        }
    }

    /// Installs base-map layers, all initially visible.
    pub fn with_base_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = (S, StyleLayerType)>,
        S: Into<String>,
    {
        self.base_layers = layers
            .into_iter()
            .map(|(id, layer_type)| BaseLayer {
                id: id.into(),
                layer_type,
                visible: true,
            })
            .collect();
        self
    }

    /// A reduced dark basemap layer list with the usual label and POI layers.
    pub fn dark_basemap_layers() -> Vec<(&'static str, StyleLayerType)> {
        vec![
            ("land", StyleLayerType::Background),
            ("water", StyleLayerType::Fill),
            ("road-street", StyleLayerType::Line),
            ("admin-0-boundary", StyleLayerType::Line),
            ("road-label", StyleLayerType::Symbol),
            ("poi-label", StyleLayerType::Symbol),
            ("airport-label", StyleLayerType::Symbol),
            ("settlement-subdivision-label", StyleLayerType::Symbol),
            ("settlement-major-label", StyleLayerType::Symbol),
            ("place-dot", StyleLayerType::Circle),
            ("state-label", StyleLayerType::Symbol),
            ("country-label", StyleLayerType::Symbol),
        ]
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn fog(&self) -> Option<&Fog> {
        self.fog.as_ref()
    }

    pub fn source(&self, id: &str) -> Option<&FeatureCollection> {
        self.sources.get(id)
    }

    /// Overlay layer ids in draw order (bottom first).
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id.as_str()).collect()
    }

    pub fn image(&self, name: &str) -> Option<&GlyphImage> {
        self.images.get(name)
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.len()
    }

    /// Features currently drawn by visible overlay layers, bottom layer first,
    /// regardless of which hemisphere faces the camera.
    pub fn rendered_features(&self) -> Vec<RenderedFeature> {
        let mut out = Vec::new();
        for layer in self.layers.iter().filter(|l| l.visible) {
            if !self.paint_draws(&layer.paint) {
                continue;
            }
            let Some(source) = self.sources.get(&layer.source) else {
                continue;
            };
            for feature in &source.features {
                if layer.filter.as_ref().is_none_or(|f| f.matches(feature)) {
                    out.push(RenderedFeature {
                        layer_id: layer.id.clone(),
                        feature: feature.clone(),
                    });
                }
            }
        }
        out
    }

    /// Screen position of a feature's anchor, if it faces the camera.
    pub fn project(&self, position: foundation::LngLat) -> Option<ScreenPoint> {
        self.camera.project(position)
    }

    // Symbol layers whose image is missing draw nothing, like a real engine.
    fn paint_draws(&self, paint: &LayerPaint) -> bool {
        match paint {
            LayerPaint::Symbol { icon_image, .. } => self.images.contains_key(icon_image),
            LayerPaint::Circle { .. } => true,
        }
    }

    fn hit_radius_px(paint: &LayerPaint) -> f64 {
        match paint {
            LayerPaint::Symbol { icon_size, .. } => GLYPH_PX * icon_size * 0.5,
            LayerPaint::Circle { radius_px, .. } => *radius_px,
        }
    }

    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.removed {
            return Err(EngineError::Removed);
        }
        Ok(())
    }

    fn record(&mut self, m: Mutation) {
        self.mutations.push(m);
    }
}

impl MapEngine for HeadlessEngine {
    fn set_projection(&mut self, projection: Projection) -> Result<(), EngineError> {
        self.ensure_live()?;
        self.projection = projection;
        self.record(Mutation::Projection(projection));
        Ok(())
    }

    fn jump_to(&mut self, camera: Camera) -> Result<(), EngineError> {
        self.ensure_live()?;
        self.camera = camera;
        self.record(Mutation::Camera);
        Ok(())
    }

    fn camera(&self) -> Camera {
        self.camera
    }

    fn set_fog(&mut self, fog: Fog) -> Result<(), EngineError> {
        self.ensure_live()?;
        self.fog = Some(fog);
        self.record(Mutation::Fog);
        Ok(())
    }

    fn style_layers(&self) -> Vec<StyleLayer> {
        let base = self.base_layers.iter().map(|l| StyleLayer {
            id: l.id.clone(),
            layer_type: l.layer_type,
            visible: l.visible,
        });
        let overlay = self.layers.iter().map(|l| StyleLayer {
            id: l.id.clone(),
            layer_type: match l.paint {
                LayerPaint::Symbol { .. } => StyleLayerType::Symbol,
                LayerPaint::Circle { .. } => StyleLayerType::Circle,
            },
            visible: l.visible,
        });
        base.chain(overlay).collect()
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn add_source(&mut self, id: &str, data: FeatureCollection) -> Result<(), EngineError> {
        self.ensure_live()?;
        if self.sources.contains_key(id) {
            return Err(EngineError::DuplicateSource(id.to_string()));
        }
        self.sources.insert(id.to_string(), data);
        self.record(Mutation::AddSource(id.to_string()));
        Ok(())
    }

    fn set_source_data(&mut self, id: &str, data: FeatureCollection) -> Result<(), EngineError> {
        self.ensure_live()?;
        let Some(slot) = self.sources.get_mut(id) else {
            return Err(EngineError::UnknownSource(id.to_string()));
        };
        *slot = data;
        self.record(Mutation::SetSourceData(id.to_string()));
        Ok(())
    }

    fn layer(&self, id: &str) -> Option<&LayerDef> {
        self.layers.iter().find(|l| l.id == id)
    }

    fn add_layer(&mut self, layer: LayerDef) -> Result<(), EngineError> {
        self.ensure_live()?;
        if self.layer_visibility(&layer.id).is_some() {
            return Err(EngineError::DuplicateLayer(layer.id));
        }
        if !self.sources.contains_key(&layer.source) {
            return Err(EngineError::UnknownSource(layer.source));
        }
        self.record(Mutation::AddLayer(layer.id.clone()));
        self.layers.push(layer);
        Ok(())
    }

    fn set_layer_paint(&mut self, id: &str, paint: LayerPaint) -> Result<(), EngineError> {
        self.ensure_live()?;
        let Some(layer) = self.layers.iter_mut().find(|l| l.id == id) else {
            return Err(EngineError::UnknownLayer(id.to_string()));
        };
        layer.paint = paint;
        self.record(Mutation::SetLayerPaint(id.to_string()));
        Ok(())
    }

    fn set_layer_visibility(&mut self, id: &str, visible: bool) -> Result<(), EngineError> {
        self.ensure_live()?;
        if let Some(layer) = self.layers.iter_mut().find(|l| l.id == id) {
            layer.visible = visible;
        } else if let Some(base) = self.base_layers.iter_mut().find(|l| l.id == id) {
            base.visible = visible;
        } else {
            return Err(EngineError::UnknownLayer(id.to_string()));
        }
        self.record(Mutation::SetLayerVisibility(id.to_string(), visible));
        Ok(())
    }

    fn layer_visibility(&self, id: &str) -> Option<bool> {
        self.layers
            .iter()
            .find(|l| l.id == id)
            .map(|l| l.visible)
            .or_else(|| {
                self.base_layers
                    .iter()
                    .find(|l| l.id == id)
                    .map(|l| l.visible)
            })
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
        self.ensure_live()?;
        let before = self.layers.len();
        self.layers.retain(|l| l.id != id);
        if self.layers.len() == before {
            return Err(EngineError::UnknownLayer(id.to_string()));
        }
        self.record(Mutation::RemoveLayer(id.to_string()));
        Ok(())
    }

    fn has_image(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }

    fn add_image(&mut self, name: &str, image: GlyphImage) -> Result<(), EngineError> {
        self.ensure_live()?;
        if self.images.contains_key(name) {
            return Err(EngineError::DuplicateImage(name.to_string()));
        }
        self.images.insert(name.to_string(), image);
        self.record(Mutation::AddImage(name.to_string()));
        Ok(())
    }

    fn query_rendered_features(
        &self,
        point: ScreenPoint,
        layer_ids: &[&str],
    ) -> Vec<RenderedFeature> {
        let mut hits = Vec::new();
        if self.removed {
            return hits;
        }

        // Topmost layer first; within a layer later features draw on top.
        for layer in self.layers.iter().rev() {
            if !layer.visible || !layer_ids.contains(&layer.id.as_str()) {
                continue;
            }
            if !self.paint_draws(&layer.paint) {
                continue;
            }
            let Some(source) = self.sources.get(&layer.source) else {
                continue;
            };
            let radius = Self::hit_radius_px(&layer.paint);
            for feature in source.features.iter().rev() {
                if layer.filter.as_ref().is_some_and(|f| !f.matches(feature)) {
                    continue;
                }
                let Some(at) = self.camera.project(feature.geometry.position()) else {
                    continue;
                };
                if at.distance(point) <= radius {
                    hits.push(RenderedFeature {
                        layer_id: layer.id.clone(),
                        feature: feature.clone(),
                    });
                }
            }
        }
        hits
    }

    fn open_popup(&mut self, popup: Popup) -> Result<(), EngineError> {
        self.ensure_live()?;
        self.popup = Some(popup);
        self.record(Mutation::OpenPopup);
        Ok(())
    }

    fn close_popup(&mut self) -> Result<(), EngineError> {
        self.ensure_live()?;
        if self.popup.take().is_some() {
            self.record(Mutation::ClosePopup);
        }
        Ok(())
    }

    fn set_cursor(&mut self, cursor: Cursor) -> Result<(), EngineError> {
        self.ensure_live()?;
        if self.cursor != cursor {
            self.cursor = cursor;
            self.record(Mutation::SetCursor(cursor));
        }
        Ok(())
    }

    fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        self.popup = None;
        self.sources.clear();
        self.layers.clear();
        self.images.clear();
        self.record(Mutation::Remove);
        tracing::debug!(style = %self.options.style_url, "headless map removed");
    }

    fn is_removed(&self) -> bool {
        self.removed
    }
}

/// Factory producing [`HeadlessEngine`]s with a fixed base style.
#[derive(Debug, Clone, Default)]
pub struct HeadlessFactory {
    base_layers: Vec<(String, StyleLayerType)>,
    created: usize,
    fail_with: Option<String>,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dark_basemap() -> Self {
        Self {
            base_layers: HeadlessEngine::dark_basemap_layers()
                .into_iter()
                .map(|(id, t)| (id.to_string(), t))
                .collect(),
            ..Self::default()
        }
    }

    /// Makes every subsequent `create` fail, e.g. to simulate a lost context.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.fail_with = Some(reason.into());
        self
    }

    /// Number of instances created so far.
    pub fn created(&self) -> usize {
        self.created
    }
}

impl EngineFactory for HeadlessFactory {
    type Engine = HeadlessEngine;

    fn create(&mut self, options: &MapOptions) -> Result<HeadlessEngine, EngineError> {
        if let Some(reason) = &self.fail_with {
            return Err(EngineError::Create(reason.clone()));
        }
        self.created += 1;
        Ok(HeadlessEngine::new(options.clone()).with_base_layers(self.base_layers.clone()))
    }
}
