use engine::{EngineError, Fog, MapEngine};
use foundation::Camera;
use layers::category_for_layer;

pub const DEFAULT_STYLE_URL: &str = "mapbox://styles/mapbox/dark-v11";

/// Base-map layer id prefixes whose point features compete with the overlay.
pub const HIDDEN_BASE_PREFIXES: [&str; 11] = [
    "poi",
    "poi-label",
    "poi-scalerank",
    "airport",
    "airport-label",
    "settlement",
    "settlement-label",
    "place",
    "place-label",
    "neighborhood",
    "road-label",
];

pub fn is_hidden_base_layer(id: &str) -> bool {
    HIDDEN_BASE_PREFIXES.iter().any(|p| id.starts_with(p))
}

/// Opaque dark atmosphere with no stars and no horizon glow.
pub fn globe_fog() -> Fog {
    Fog {
        color: "rgba(0,0,0,0.9)".to_string(),
        high_color: "rgba(0,0,0,0.9)".to_string(),
        space_color: "rgba(0,0,0,0)".to_string(),
        horizon_blend: 0.0,
        star_intensity: 0.0,
    }
}

pub fn initial_camera() -> Camera {
    Camera::default()
}

/// Hides visible base-map circle/symbol layers matching the denylist.
///
/// Returns the ids that were hidden. Overlay layers are never touched.
pub fn hide_base_point_layers<E: MapEngine + ?Sized>(
    engine: &mut E,
) -> Result<Vec<String>, EngineError> {
    let mut hidden = Vec::new();
    for layer in engine.style_layers() {
        if !layer.visible || !layer.layer_type.is_point_like() {
            continue;
        }
        if category_for_layer(&layer.id).is_some() || !is_hidden_base_layer(&layer.id) {
            continue;
        }
        engine.set_layer_visibility(&layer.id, false)?;
        hidden.push(layer.id);
    }
    if !hidden.is_empty() {
        tracing::debug!(count = hidden.len(), "base-map point layers hidden");
    }
    Ok(hidden)
}
