use catalog::EventCategory;
use engine::LayerPaint;

/// Accent applied to every category glyph.
pub const ACCENT_COLOR: &str = "#B74735";
pub const ICON_SIZE: f64 = 0.5;
pub const FALLBACK_RADIUS_PX: f64 = 5.0;

/// Per-category presentation row.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CategoryStyle {
    pub category: EventCategory,
    pub layer_id: &'static str,
    /// Name under which the glyph is registered in the engine.
    pub icon_name: &'static str,
    /// Asset file, relative to the icon root.
    pub icon_file: &'static str,
    /// Tag shown on the popup card.
    pub label: &'static str,
    pub color: &'static str,
}

impl CategoryStyle {
    pub fn glyph_paint(&self) -> LayerPaint {
        LayerPaint::Symbol {
            icon_image: self.icon_name.to_string(),
            icon_size: ICON_SIZE,
            icon_color: self.color.to_string(),
        }
    }

    /// Default marker used when the category's glyph never loaded.
    pub fn fallback_paint(&self) -> LayerPaint {
        LayerPaint::Circle {
            radius_px: FALLBACK_RADIUS_PX,
            color: self.color.to_string(),
        }
    }
}

/// Style table in layer creation order. Adding a category is a new row here.
pub static CATEGORY_STYLES: [CategoryStyle; EventCategory::COUNT] = [
    CategoryStyle {
        category: EventCategory::Conflict,
        layer_id: "conflict-symbols",
        icon_name: "protocol-conflict",
        icon_file: "icon-conflict.png",
        label: "CONFLICT ZONE",
        color: ACCENT_COLOR,
    },
    CategoryStyle {
        category: EventCategory::Protest,
        layer_id: "protests-symbols",
        icon_name: "protocol-protests",
        icon_file: "icon-protests.png",
        label: "CIVIL UNREST",
        color: ACCENT_COLOR,
    },
    CategoryStyle {
        category: EventCategory::Shipping,
        layer_id: "shipping-symbols",
        icon_name: "protocol-shipping",
        icon_file: "icon-shipping.png",
        label: "SHIPPING LANE",
        color: ACCENT_COLOR,
    },
    CategoryStyle {
        category: EventCategory::Air,
        layer_id: "air-symbols",
        icon_name: "protocol-air",
        icon_file: "icon-air.png",
        label: "AIR CORRIDOR",
        color: ACCENT_COLOR,
    },
    CategoryStyle {
        category: EventCategory::Infrastructure,
        layer_id: "infrastructure-symbols",
        icon_name: "protocol-infrastructure",
        icon_file: "icon-infra.png",
        label: "NASCENT INFRASTRUCTURE",
        color: ACCENT_COLOR,
    },
    CategoryStyle {
        category: EventCategory::Cultural,
        layer_id: "cultural-symbols",
        icon_name: "protocol-cultural",
        icon_file: "icon-culture.png",
        label: "CULTURAL EVENT",
        color: ACCENT_COLOR,
    },
];

pub fn style_for(category: EventCategory) -> &'static CategoryStyle {
    &CATEGORY_STYLES[category.index()]
}

/// Reverse lookup from an engine layer id.
pub fn category_for_layer(layer_id: &str) -> Option<EventCategory> {
    CATEGORY_STYLES
        .iter()
        .find(|s| s.layer_id == layer_id)
        .map(|s| s.category)
}
