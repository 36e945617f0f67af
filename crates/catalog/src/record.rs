use std::collections::HashSet;

use foundation::{GeoError, LngLat, Timestamp};
use serde::Deserialize;
use serde_json::Value;

use crate::category::EventCategory;
use crate::event::Event;

/// Loosely-typed catalogue record as it arrives on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEventRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "protocolLayer")]
    pub category: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default, alias = "latitude")]
    pub lat: Option<f64>,
    #[serde(default, alias = "lon", alias = "longitude")]
    pub lng: Option<f64>,
    #[serde(default, alias = "timestamp")]
    pub ts: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    NotAnObject(String),
    MissingField(&'static str),
    UnknownCategory(String),
    BadPosition(GeoError),
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::NotAnObject(msg) => write!(f, "record is not a valid object: {msg}"),
            RecordError::MissingField(field) => write!(f, "record is missing `{field}`"),
            RecordError::UnknownCategory(c) => write!(f, "unknown category {c:?}"),
            RecordError::BadPosition(e) => write!(f, "bad position: {e}"),
        }
    }
}

impl std::error::Error for RecordError {}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Validates one raw record into a canonical [`Event`].
pub fn normalize_record(raw: RawEventRecord) -> Result<Event, RecordError> {
    let id = non_blank(raw.id).ok_or(RecordError::MissingField("id"))?;
    let category_raw = non_blank(raw.category).ok_or(RecordError::MissingField("category"))?;
    let category = EventCategory::parse(&category_raw)
        .ok_or(RecordError::UnknownCategory(category_raw))?;
    let lat = raw.lat.ok_or(RecordError::MissingField("lat"))?;
    let lng = raw.lng.ok_or(RecordError::MissingField("lng"))?;
    let position = LngLat::try_new(lng, lat).map_err(RecordError::BadPosition)?;

    let timestamp = match non_blank(raw.ts) {
        Some(ts) => {
            let parsed = Timestamp::parse(&ts);
            if parsed.is_none() {
                tracing::warn!(id = %id, ts = %ts, "ignoring unparseable event timestamp");
            }
            parsed
        }
        None => None,
    };

    let kind = non_blank(raw.kind).unwrap_or_else(|| category.as_str().to_ascii_uppercase());

    Ok(Event {
        id,
        category,
        kind,
        position,
        timestamp,
        title: raw.title.map(|t| t.trim().to_string()).unwrap_or_default(),
        subtitle: non_blank(raw.subtitle),
        country: non_blank(raw.country),
    })
}

/// Normalizes a batch of JSON records, dropping malformed ones and later
/// duplicates of an already-seen id. Input order is preserved.
pub fn normalize_records(values: Vec<Value>) -> Vec<Event> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(values.len());
    let mut dropped = 0usize;

    for (index, value) in values.into_iter().enumerate() {
        let event = serde_json::from_value::<RawEventRecord>(value)
            .map_err(|e| RecordError::NotAnObject(e.to_string()))
            .and_then(normalize_record);

        match event {
            Ok(event) => {
                if !seen.insert(event.id.clone()) {
                    tracing::warn!(id = %event.id, index, "dropping duplicate event id");
                    dropped += 1;
                    continue;
                }
                out.push(event);
            }
            Err(err) => {
                tracing::warn!(index, error = %err, "dropping malformed event record");
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        tracing::info!(kept = out.len(), dropped, "normalized event catalogue");
    }
    out
}
