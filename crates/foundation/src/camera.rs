use serde::{Deserialize, Serialize};

use crate::geo::{LngLat, ScreenPoint};

/// Pixel width of the world at zoom 0, matching web-map tile conventions.
pub const WORLD_SIZE_PX: f64 = 512.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    #[default]
    Globe,
    Mercator,
}

/// Camera framing for a globe view.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub center: LngLat,
    pub zoom: f64,
    /// Viewport size in pixels `[width, height]`.
    pub viewport: [f64; 2],
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            center: LngLat::new(10.0, 10.0),
            zoom: 1.8,
            viewport: [1280.0, 720.0],
        }
    }
}

impl Camera {
    pub fn new(center: LngLat, zoom: f64, viewport: [f64; 2]) -> Self {
        Self {
            center,
            zoom,
            viewport,
        }
    }

    /// Globe radius in pixels at the current zoom.
    pub fn globe_radius_px(&self) -> f64 {
        WORLD_SIZE_PX * 2f64.powf(self.zoom) / (2.0 * std::f64::consts::PI)
    }

    /// Orthographic projection of `p` onto the viewport.
    ///
    /// Returns `None` for points on the far hemisphere.
    pub fn project(&self, p: LngLat) -> Option<ScreenPoint> {
        let lat = p.lat.to_radians();
        let lat0 = self.center.lat.to_radians();
        let dlon = (p.lng - self.center.lng).to_radians();

        let cos_c = lat0.sin() * lat.sin() + lat0.cos() * lat.cos() * dlon.cos();
        if cos_c < 0.0 {
            return None;
        }

        let r = self.globe_radius_px();
        let x = r * lat.cos() * dlon.sin();
        let y = r * (lat0.cos() * lat.sin() - lat0.sin() * lat.cos() * dlon.cos());

        Some(ScreenPoint::new(
            self.viewport[0] * 0.5 + x,
            self.viewport[1] * 0.5 - y,
        ))
    }
}
