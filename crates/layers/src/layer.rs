use catalog::{Event, EventCategory};

use crate::symbology::{CategoryStyle, style_for};
use crate::visibility::VisibilitySelection;

/// Derived, never persisted view of one category's layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer<'a> {
    pub category: EventCategory,
    pub style: &'static CategoryStyle,
    pub events: Vec<&'a Event>,
    pub visible: bool,
}

impl Layer<'_> {
    pub fn id(&self) -> &'static str {
        self.style.layer_id
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Symbols a user can currently see and click.
    pub fn interactive_count(&self) -> usize {
        if self.visible { self.events.len() } else { 0 }
    }
}

/// Derives one layer per category, in creation order, empty ones included.
pub fn derive_layers<'a>(events: &'a [Event], selection: &VisibilitySelection) -> Vec<Layer<'a>> {
    EventCategory::ALL
        .into_iter()
        .map(|category| Layer {
            category,
            style: style_for(category),
            events: events.iter().filter(|e| e.category == category).collect(),
            visible: selection.is_visible(category),
        })
        .collect()
}
