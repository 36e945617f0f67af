use foundation::{LngLat, Timestamp};

use crate::category::EventCategory;

/// A canonical, validated catalogue record.
///
/// Only produced by [`crate::record::normalize_record`] or the fixture
/// builders, so `position` is always in range and `category` is always known.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub category: EventCategory,
    /// Free-form label such as `CONFLICT` or `VESSEL`.
    pub kind: String,
    pub position: LngLat,
    pub timestamp: Option<Timestamp>,
    pub title: String,
    pub subtitle: Option<String>,
    pub country: Option<String>,
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        category: EventCategory,
        kind: impl Into<String>,
        position: LngLat,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            kind: kind.into(),
            position,
            timestamp: None,
            title: title.into(),
            subtitle: None,
            country: None,
        }
    }

    pub fn with_timestamp(mut self, ts: Timestamp) -> Self {
        self.timestamp = Some(ts);
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

/// Looks up an event by id in catalogue order.
pub fn find_event<'a>(events: &'a [Event], id: &str) -> Option<&'a Event> {
    events.iter().find(|e| e.id == id)
}

/// Number of events in each category, indexed by [`EventCategory::index`].
pub fn count_by_category(events: &[Event]) -> [usize; EventCategory::COUNT] {
    let mut counts = [0usize; EventCategory::COUNT];
    for e in events {
        counts[e.category.index()] += 1;
    }
    counts
}
