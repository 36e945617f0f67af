use foundation::{LngLat, Timestamp};

use crate::category::EventCategory;
use crate::event::Event;

struct Row {
    id: &'static str,
    category: EventCategory,
    kind: &'static str,
    lat: f64,
    lng: f64,
    ts: &'static str,
    title: &'static str,
    subtitle: &'static str,
    country: &'static str,
}

const ROWS: &[Row] = &[
    Row {
        id: "conflict_001",
        category: EventCategory::Conflict,
        kind: "CONFLICT",
        lat: 9.0765,
        lng: 7.3986,
        ts: "2024-11-20T12:30:00Z",
        title: "Armed clash",
        subtitle: "Battles",
        country: "Nigeria",
    },
    Row {
        id: "conflict_002",
        category: EventCategory::Conflict,
        kind: "CONFLICT",
        lat: 6.5244,
        lng: 3.3792,
        ts: "2024-11-19T15:00:00Z",
        title: "Protest with intervention",
        subtitle: "Urban disturbance",
        country: "Nigeria",
    },
    Row {
        id: "protest_001",
        category: EventCategory::Protest,
        kind: "PROTEST",
        lat: 5.6037,
        lng: -0.187,
        ts: "2024-11-18T08:00:00Z",
        title: "Port workers strike",
        subtitle: "Civil unrest",
        country: "Ghana",
    },
    Row {
        id: "ship_001",
        category: EventCategory::Shipping,
        kind: "VESSEL",
        lat: 4.5,
        lng: 7.0,
        ts: "2024-11-20T11:55:00Z",
        title: "MAERSK LAGOS",
        subtitle: "Container vessel",
        country: "Liberia",
    },
    Row {
        id: "ship_002",
        category: EventCategory::Shipping,
        kind: "VESSEL",
        lat: 6.0,
        lng: 2.4,
        ts: "2024-11-20T12:05:00Z",
        title: "MSC ATLANTIC",
        subtitle: "Container vessel",
        country: "Panama",
    },
    Row {
        id: "air_001",
        category: EventCategory::Air,
        kind: "AIRCRAFT",
        lat: 8.9915,
        lng: 7.3943,
        ts: "2024-11-20T12:35:00Z",
        title: "KQ101",
        subtitle: "Live flight",
        country: "Kenya",
    },
    Row {
        id: "air_002",
        category: EventCategory::Air,
        kind: "AIRCRAFT",
        lat: 14.5994,
        lng: -17.451,
        ts: "2024-11-20T12:36:00Z",
        title: "BA74",
        subtitle: "Live flight",
        country: "UK",
    },
    Row {
        id: "infra_001",
        category: EventCategory::Infrastructure,
        kind: "INFRA",
        lat: 9.0579,
        lng: 7.4951,
        ts: "2024-11-10T10:00:00Z",
        title: "New power substation",
        subtitle: "Under construction",
        country: "Nigeria",
    },
    Row {
        id: "culture_001",
        category: EventCategory::Cultural,
        kind: "CULTURE",
        lat: 6.4654,
        lng: 3.4064,
        ts: "2024-11-21T18:00:00Z",
        title: "Art festival",
        subtitle: "Cultural event",
        country: "Nigeria",
    },
];

/// The built-in West Africa demo catalogue, in category order.
pub fn demo_events() -> Vec<Event> {
    ROWS.iter()
        .map(|r| {
            let mut e = Event::new(
                r.id,
                r.category,
                r.kind,
                LngLat::new(r.lng, r.lat),
                r.title,
            )
            .with_subtitle(r.subtitle)
            .with_country(r.country);
            e.timestamp = Timestamp::parse(r.ts);
            e
        })
        .collect()
}
