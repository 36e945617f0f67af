use catalog::{Event, EventCategory};
use engine::{Feature, FeatureCollection};

/// Feature property carrying the category name; layer filters key on it.
pub const CATEGORY_PROPERTY: &str = "category";
pub const ID_PROPERTY: &str = "id";

pub fn event_feature(e: &Event) -> Feature {
    let mut f = Feature::point(e.position)
        .with_property(ID_PROPERTY, e.id.as_str())
        .with_property(CATEGORY_PROPERTY, e.category.as_str())
        .with_property("kind", e.kind.as_str())
        .with_property("title", e.title.as_str());
    if let Some(subtitle) = &e.subtitle {
        f = f.with_property("subtitle", subtitle.as_str());
    }
    if let Some(country) = &e.country {
        f = f.with_property("country", country.as_str());
    }
    if let Some(ts) = &e.timestamp {
        f = f.with_property("ts", ts.to_rfc3339());
    }
    f
}

/// Builds the complete source collection, grouped by category in layer
/// order and keeping catalogue order within a category.
pub fn build_feature_collection(events: &[Event]) -> FeatureCollection {
    let mut features = Vec::with_capacity(events.len());
    for category in EventCategory::ALL {
        features.extend(
            events
                .iter()
                .filter(|e| e.category == category)
                .map(event_feature),
        );
    }
    FeatureCollection::new(features)
}
