use foundation::{Camera, LngLat, Projection, ScreenPoint};
use serde::{Deserialize, Serialize};

use crate::feature::{Feature, FeatureCollection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    Removed,
    UnknownSource(String),
    DuplicateSource(String),
    UnknownLayer(String),
    DuplicateLayer(String),
    DuplicateImage(String),
    InvalidImage(String),
    Create(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Removed => write!(f, "map instance has been removed"),
            EngineError::UnknownSource(id) => write!(f, "unknown source {id:?}"),
            EngineError::DuplicateSource(id) => write!(f, "source {id:?} already exists"),
            EngineError::UnknownLayer(id) => write!(f, "unknown layer {id:?}"),
            EngineError::DuplicateLayer(id) => write!(f, "layer {id:?} already exists"),
            EngineError::DuplicateImage(name) => write!(f, "image {name:?} already registered"),
            EngineError::InvalidImage(msg) => write!(f, "invalid image: {msg}"),
            EngineError::Create(msg) => write!(f, "failed to create map: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Options used to create a map instance.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub access_token: String,
    pub style_url: String,
    pub camera: Camera,
    pub projection: Projection,
}

/// Atmosphere settings for globe rendering. Colors are CSS color strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Fog {
    pub color: String,
    pub high_color: String,
    pub space_color: String,
    pub horizon_blend: f64,
    pub star_intensity: f64,
}

/// Matches features whose string property `key` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub key: String,
    pub value: String,
}

impl PropertyFilter {
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, feature: &Feature) -> bool {
        feature.property_str(&self.key) == Some(self.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerPaint {
    /// Recolorable glyph drawn from the image registry.
    Symbol {
        icon_image: String,
        icon_size: f64,
        icon_color: String,
    },
    Circle {
        radius_px: f64,
        color: String,
    },
}

/// A data-driven overlay layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDef {
    pub id: String,
    pub source: String,
    pub filter: Option<PropertyFilter>,
    pub paint: LayerPaint,
    pub visible: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleLayerType {
    Background,
    Fill,
    Line,
    Symbol,
    Circle,
    Raster,
}

impl StyleLayerType {
    pub fn is_point_like(self) -> bool {
        matches!(self, StyleLayerType::Symbol | StyleLayerType::Circle)
    }
}

/// Summary of one layer in the engine's current style, base map included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleLayer {
    pub id: String,
    pub layer_type: StyleLayerType,
    pub visible: bool,
}

/// Single-channel glyph image; the engine tints it at draw time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphImage {
    pub width: u32,
    pub height: u32,
    pub alpha: Vec<u8>,
}

impl GlyphImage {
    pub fn new(width: u32, height: u32, alpha: Vec<u8>) -> Result<Self, EngineError> {
        let expected = width as usize * height as usize;
        if width == 0 || height == 0 || alpha.len() != expected {
            return Err(EngineError::InvalidImage(format!(
                "{width}x{height} needs {expected} alpha bytes, got {}",
                alpha.len()
            )));
        }
        Ok(Self {
            width,
            height,
            alpha,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupAnchor {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Popup {
    pub position: LngLat,
    pub html: String,
    pub anchor: PopupAnchor,
    pub offset: [f64; 2],
    pub close_button: bool,
    pub close_on_move: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    pub layer_id: String,
    pub feature: Feature,
}

/// The rendering-engine surface the overlay drives.
///
/// One value is one live map instance. All calls happen on the thread that
/// owns the instance; after [`MapEngine::remove`] every mutation fails with
/// [`EngineError::Removed`].
pub trait MapEngine {
    fn set_projection(&mut self, projection: Projection) -> Result<(), EngineError>;
    fn jump_to(&mut self, camera: Camera) -> Result<(), EngineError>;
    fn camera(&self) -> Camera;
    fn set_fog(&mut self, fog: Fog) -> Result<(), EngineError>;

    /// Every layer of the current style in draw order.
    fn style_layers(&self) -> Vec<StyleLayer>;

    fn has_source(&self, id: &str) -> bool;
    fn add_source(&mut self, id: &str, data: FeatureCollection) -> Result<(), EngineError>;
    /// Replaces the whole collection of an existing source in one update.
    fn set_source_data(&mut self, id: &str, data: FeatureCollection) -> Result<(), EngineError>;

    fn layer(&self, id: &str) -> Option<&LayerDef>;
    fn add_layer(&mut self, layer: LayerDef) -> Result<(), EngineError>;
    fn set_layer_paint(&mut self, id: &str, paint: LayerPaint) -> Result<(), EngineError>;
    /// Works for overlay and base-style layers alike.
    fn set_layer_visibility(&mut self, id: &str, visible: bool) -> Result<(), EngineError>;
    fn layer_visibility(&self, id: &str) -> Option<bool>;
    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError>;

    fn has_image(&self, name: &str) -> bool;
    fn add_image(&mut self, name: &str, image: GlyphImage) -> Result<(), EngineError>;

    /// Features drawn under `point` on the given layers, topmost first.
    /// Hidden layers never report hits.
    fn query_rendered_features(&self, point: ScreenPoint, layer_ids: &[&str])
    -> Vec<RenderedFeature>;

    /// Opens `popup`, replacing any popup already open.
    fn open_popup(&mut self, popup: Popup) -> Result<(), EngineError>;
    fn close_popup(&mut self) -> Result<(), EngineError>;
    fn set_cursor(&mut self, cursor: Cursor) -> Result<(), EngineError>;

    /// Releases the instance. Idempotent.
    fn remove(&mut self);
    fn is_removed(&self) -> bool;
}

/// Creates engine instances for a viewport.
pub trait EngineFactory {
    type Engine: MapEngine;

    fn create(&mut self, options: &MapOptions) -> Result<Self::Engine, EngineError>;
}
