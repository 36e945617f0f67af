use catalog::{Event, EventCategory};
use engine::{EngineError, FeatureCollection, LayerDef, MapEngine, PropertyFilter};

use crate::features::{CATEGORY_PROPERTY, build_feature_collection};
use crate::symbology::{CATEGORY_STYLES, style_for};
use crate::visibility::VisibilitySelection;

/// Engine source holding every catalogue event.
pub const EVENT_SOURCE_ID: &str = "protocol-events";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SourceUpdate {
    #[default]
    Unchanged,
    Created,
    Replaced,
}

/// What one synchronization pass changed in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub source: SourceUpdate,
    pub created: Vec<EventCategory>,
    /// Layers whose paint switched between glyph and fallback marker.
    pub restyled: Vec<EventCategory>,
    pub visibility_changed: Vec<EventCategory>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.source == SourceUpdate::Unchanged
            && self.created.is_empty()
            && self.restyled.is_empty()
            && self.visibility_changed.is_empty()
    }
}

/// Reconciles the engine's overlay layers with (catalogue, selection).
///
/// The only state kept here is a digest of the collection last pushed to the
/// engine; layer existence, paint and visibility are always read back from the
/// engine itself, so a pass over unchanged inputs issues no engine calls that
/// mutate anything.
#[derive(Debug, Default)]
pub struct LayerSynchronizer {
    pushed_digest: Option<blake3::Hash>,
}

impl LayerSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets what was pushed, e.g. after the engine instance is replaced.
    pub fn reset(&mut self) {
        self.pushed_digest = None;
    }

    /// Full pass: source data, missing layers, then visibility flags.
    pub fn sync<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        events: &[Event],
        selection: &VisibilitySelection,
    ) -> Result<SyncReport, EngineError> {
        let source = self.sync_catalog(engine, events)?;
        let (created, restyled) = self.ensure_layers(engine, selection)?;
        let visibility_changed = self.apply_visibility(engine, selection)?;
        Ok(SyncReport {
            source,
            created,
            restyled,
            visibility_changed,
        })
    }

    /// Pushes the rebuilt collection in a single source update, skipping the
    /// call entirely when it matches what the engine already holds.
    pub fn sync_catalog<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        events: &[Event],
    ) -> Result<SourceUpdate, EngineError> {
        let collection = build_feature_collection(events);
        let digest = digest(&collection);

        let update = if engine.has_source(EVENT_SOURCE_ID) {
            if digest.is_some() && digest == self.pushed_digest {
                return Ok(SourceUpdate::Unchanged);
            }
            engine.set_source_data(EVENT_SOURCE_ID, collection)?;
            SourceUpdate::Replaced
        } else {
            engine.add_source(EVENT_SOURCE_ID, collection)?;
            SourceUpdate::Created
        };

        self.pushed_digest = digest;
        tracing::debug!(events = events.len(), ?update, "event source synchronized");
        Ok(update)
    }

    /// Creates missing category layers in table order and swaps the paint of
    /// existing ones when glyph availability changed.
    pub fn ensure_layers<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        selection: &VisibilitySelection,
    ) -> Result<(Vec<EventCategory>, Vec<EventCategory>), EngineError> {
        let mut created = Vec::new();
        let mut restyled = Vec::new();

        for style in CATEGORY_STYLES.iter() {
            let has_glyph = engine.has_image(style.icon_name);
            let paint = if has_glyph {
                style.glyph_paint()
            } else {
                style.fallback_paint()
            };

            let current = engine.layer(style.layer_id).map(|l| l.paint.clone());
            match current {
                None => {
                    if !has_glyph {
                        tracing::warn!(
                            category = %style.category,
                            icon = style.icon_name,
                            "glyph unavailable, using fallback marker"
                        );
                    }
                    engine.add_layer(LayerDef {
                        id: style.layer_id.to_string(),
                        source: EVENT_SOURCE_ID.to_string(),
                        filter: Some(PropertyFilter::eq(
                            CATEGORY_PROPERTY,
                            style.category.as_str(),
                        )),
                        paint,
                        visible: selection.is_visible(style.category),
                    })?;
                    created.push(style.category);
                }
                Some(existing) if existing != paint => {
                    engine.set_layer_paint(style.layer_id, paint)?;
                    restyled.push(style.category);
                }
                Some(_) => {}
            }
        }

        Ok((created, restyled))
    }

    /// Re-evaluates glyph availability for layers that already exist; never
    /// creates layers.
    pub fn refresh_paint<E: MapEngine + ?Sized>(
        &self,
        engine: &mut E,
    ) -> Result<Vec<EventCategory>, EngineError> {
        let mut restyled = Vec::new();
        for style in CATEGORY_STYLES.iter() {
            let Some(current) = engine.layer(style.layer_id).map(|l| l.paint.clone()) else {
                continue;
            };
            let paint = if engine.has_image(style.icon_name) {
                style.glyph_paint()
            } else {
                style.fallback_paint()
            };
            if current != paint {
                engine.set_layer_paint(style.layer_id, paint)?;
                restyled.push(style.category);
            }
        }
        Ok(restyled)
    }

    /// Flips only the layers whose engine flag disagrees with `selection`.
    pub fn apply_visibility<E: MapEngine + ?Sized>(
        &self,
        engine: &mut E,
        selection: &VisibilitySelection,
    ) -> Result<Vec<EventCategory>, EngineError> {
        let mut changed = Vec::new();
        for (category, visible) in selection.iter() {
            let layer_id = style_for(category).layer_id;
            if engine.layer_visibility(layer_id).is_some_and(|v| v != visible) {
                engine.set_layer_visibility(layer_id, visible)?;
                changed.push(category);
            }
        }
        Ok(changed)
    }
}

fn digest(collection: &FeatureCollection) -> Option<blake3::Hash> {
    serde_json::to_vec(collection)
        .ok()
        .map(|bytes| blake3::hash(&bytes))
}

#[cfg(test)]
mod tests {
    use super::{EVENT_SOURCE_ID, LayerSynchronizer, SourceUpdate};
    use crate::symbology::{CATEGORY_STYLES, style_for};
    use crate::visibility::VisibilitySelection;
    use catalog::{Event, EventCategory};
    use engine::{
        GlyphImage, HeadlessEngine, LayerPaint, MapEngine, MapOptions, Mutation,
    };
    use foundation::{Camera, LngLat, Projection};
    use pretty_assertions::assert_eq;

    fn engine() -> HeadlessEngine {
        HeadlessEngine::new(MapOptions {
            access_token: "pk.test".to_string(),
            style_url: "mapbox://styles/mapbox/dark-v11".to_string(),
            camera: Camera::new(LngLat::new(5.0, 7.0), 4.0, [1024.0, 768.0]),
            projection: Projection::Globe,
        })
    }

    fn with_glyphs(mut engine: HeadlessEngine, skip: &[EventCategory]) -> HeadlessEngine {
        for style in CATEGORY_STYLES.iter() {
            if skip.contains(&style.category) {
                continue;
            }
            let glyph = GlyphImage::new(2, 2, vec![255; 4]).unwrap();
            engine.add_image(style.icon_name, glyph).unwrap();
        }
        engine
    }

    fn ev(id: &str, category: EventCategory, lng: f64, lat: f64) -> Event {
        Event::new(id, category, "K", LngLat::new(lng, lat), id)
    }

    fn mixed_catalogue() -> Vec<Event> {
        vec![
            ev("c1", EventCategory::Conflict, 7.4, 9.0),
            ev("c2", EventCategory::Conflict, 3.4, 6.5),
            ev("p1", EventCategory::Protest, -0.2, 5.6),
            ev("s1", EventCategory::Shipping, 7.0, 4.5),
            ev("a1", EventCategory::Air, 7.4, 9.0),
            ev("a2", EventCategory::Air, -17.4, 14.6),
            ev("i1", EventCategory::Infrastructure, 7.5, 9.1),
        ]
    }

    #[test]
    fn interactive_symbols_match_selected_events_for_every_selection() {
        let events = mixed_catalogue();
        for mask in 0u32..(1 << EventCategory::COUNT) {
            let selection = VisibilitySelection::from_enabled(
                EventCategory::ALL
                    .into_iter()
                    .filter(|c| mask & (1 << c.index()) != 0),
            );
            let mut engine = with_glyphs(engine(), &[]);
            LayerSynchronizer::new()
                .sync(&mut engine, &events, &selection)
                .unwrap();

            let expected = events
                .iter()
                .filter(|e| selection.is_visible(e.category))
                .count();
            assert_eq!(engine.rendered_features().len(), expected, "mask {mask:#b}");
        }
    }

    #[test]
    fn creates_layers_in_fixed_order_even_when_empty() {
        let mut engine = with_glyphs(engine(), &[]);
        let report = LayerSynchronizer::new()
            .sync(&mut engine, &[], &VisibilitySelection::default())
            .unwrap();

        assert_eq!(report.source, SourceUpdate::Created);
        assert_eq!(report.created, EventCategory::ALL.to_vec());
        assert_eq!(
            engine.layer_ids(),
            vec![
                "conflict-symbols",
                "protests-symbols",
                "shipping-symbols",
                "air-symbols",
                "infrastructure-symbols",
                "cultural-symbols",
            ]
        );
        assert!(engine.source(EVENT_SOURCE_ID).unwrap().is_empty());
    }

    #[test]
    fn toggling_one_category_touches_only_its_layer() {
        let events = mixed_catalogue();
        let mut engine = with_glyphs(engine(), &[]);
        let mut sync = LayerSynchronizer::new();
        let mut selection = VisibilitySelection::default();
        sync.sync(&mut engine, &events, &selection).unwrap();

        let before = engine.mutation_count();
        selection.toggle(EventCategory::Air);
        let changed = sync.apply_visibility(&mut engine, &selection).unwrap();

        assert_eq!(changed, vec![EventCategory::Air]);
        assert_eq!(
            &engine.mutations()[before..],
            &[Mutation::SetLayerVisibility("air-symbols".to_string(), true)]
        );
    }

    #[test]
    fn resync_with_unchanged_inputs_is_a_noop() {
        let events = mixed_catalogue();
        let selection = VisibilitySelection::default();
        let mut engine = with_glyphs(engine(), &[]);
        let mut sync = LayerSynchronizer::new();
        sync.sync(&mut engine, &events, &selection).unwrap();

        let before = engine.mutation_count();
        let report = sync.sync(&mut engine, &events, &selection).unwrap();
        assert!(report.is_noop());
        assert_eq!(engine.mutation_count(), before);
    }

    #[test]
    fn catalogue_change_is_one_atomic_source_update() {
        let mut events = mixed_catalogue();
        let selection = VisibilitySelection::all_visible();
        let mut engine = with_glyphs(engine(), &[]);
        let mut sync = LayerSynchronizer::new();
        sync.sync(&mut engine, &events, &selection).unwrap();

        events.push(ev("x1", EventCategory::Cultural, 3.4, 6.4));
        events.push(ev("x2", EventCategory::Cultural, 3.5, 6.5));
        let before = engine.mutation_count();
        let report = sync.sync(&mut engine, &events, &selection).unwrap();

        assert_eq!(report.source, SourceUpdate::Replaced);
        assert_eq!(
            &engine.mutations()[before..],
            &[Mutation::SetSourceData(EVENT_SOURCE_ID.to_string())]
        );
        assert_eq!(engine.source(EVENT_SOURCE_ID).unwrap().len(), 9);
    }

    #[test]
    fn empty_category_layer_exists_and_toggling_renders_nothing_new() {
        let events = mixed_catalogue();
        let mut selection = VisibilitySelection::all_visible();
        let mut engine = with_glyphs(engine(), &[]);
        let mut sync = LayerSynchronizer::new();
        sync.sync(&mut engine, &events, &selection).unwrap();

        let cultural = style_for(EventCategory::Cultural).layer_id;
        assert!(engine.layer(cultural).is_some());
        let rendered = engine.rendered_features().len();

        selection.toggle(EventCategory::Cultural);
        sync.apply_visibility(&mut engine, &selection).unwrap();
        assert_eq!(engine.layer_visibility(cultural), Some(false));
        assert_eq!(engine.rendered_features().len(), rendered);

        // Growth in an empty category appears without restructuring.
        let mut grown = events.clone();
        grown.push(ev("k1", EventCategory::Cultural, 3.4, 6.4));
        selection.toggle(EventCategory::Cultural);
        let report = sync.sync(&mut engine, &grown, &selection).unwrap();
        assert!(report.created.is_empty());
        assert_eq!(engine.rendered_features().len(), rendered + 1);
    }

    #[test]
    fn two_conflicts_one_hidden_ship() {
        let events = vec![
            ev("c1", EventCategory::Conflict, 7.4, 9.0),
            ev("c2", EventCategory::Conflict, 3.4, 6.5),
            ev("s1", EventCategory::Shipping, 7.0, 4.5),
        ];
        let selection = VisibilitySelection::from_enabled([EventCategory::Conflict]);
        let mut engine = with_glyphs(engine(), &[]);
        LayerSynchronizer::new()
            .sync(&mut engine, &events, &selection)
            .unwrap();

        let rendered = engine.rendered_features();
        assert_eq!(rendered.len(), 2);
        assert!(
            rendered
                .iter()
                .all(|r| r.feature.property_str("category") == Some("conflict"))
        );
    }

    #[test]
    fn missing_glyph_falls_back_to_circle_marker() {
        let events = vec![ev("a1", EventCategory::Air, 7.4, 9.0)];
        let selection = VisibilitySelection::from_enabled([EventCategory::Air]);
        let mut engine = with_glyphs(engine(), &[EventCategory::Air]);
        let report = LayerSynchronizer::new()
            .sync(&mut engine, &events, &selection)
            .unwrap();

        assert_eq!(report.created.len(), EventCategory::COUNT);
        let air = engine.layer("air-symbols").expect("air layer");
        assert!(air.visible);
        assert!(matches!(air.paint, LayerPaint::Circle { .. }));
        let conflict = engine.layer("conflict-symbols").expect("conflict layer");
        assert!(matches!(conflict.paint, LayerPaint::Symbol { .. }));
        assert_eq!(engine.rendered_features().len(), 1);
    }

    #[test]
    fn late_glyph_upgrades_fallback_layer() {
        let events = vec![ev("a1", EventCategory::Air, 7.4, 9.0)];
        let selection = VisibilitySelection::all_visible();
        let mut engine = with_glyphs(engine(), &[EventCategory::Air]);
        let mut sync = LayerSynchronizer::new();
        sync.sync(&mut engine, &events, &selection).unwrap();

        engine
            .add_image("protocol-air", GlyphImage::new(1, 1, vec![255]).unwrap())
            .unwrap();
        let report = sync.sync(&mut engine, &events, &selection).unwrap();
        assert_eq!(report.restyled, vec![EventCategory::Air]);
        assert!(matches!(
            engine.layer("air-symbols").unwrap().paint,
            LayerPaint::Symbol { .. }
        ));
    }

    #[test]
    fn refresh_paint_leaves_missing_layers_alone() {
        let mut engine = with_glyphs(engine(), &[]);
        let sync = LayerSynchronizer::new();
        assert!(sync.refresh_paint(&mut engine).unwrap().is_empty());
        assert!(engine.layer_ids().is_empty());
        assert_eq!(engine.mutation_count(), EventCategory::COUNT);
    }

    #[test]
    fn reset_repushes_into_a_fresh_engine() {
        let events = mixed_catalogue();
        let selection = VisibilitySelection::default();
        let mut sync = LayerSynchronizer::new();
        let mut first = with_glyphs(engine(), &[]);
        sync.sync(&mut first, &events, &selection).unwrap();

        sync.reset();
        let mut second = with_glyphs(engine(), &[]);
        let report = sync.sync(&mut second, &events, &selection).unwrap();
        assert_eq!(report.source, SourceUpdate::Created);
        assert_eq!(second.layer_ids().len(), EventCategory::COUNT);
    }
}
