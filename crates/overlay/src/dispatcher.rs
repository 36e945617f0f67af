use catalog::{Event, find_event};
use engine::{Cursor, EngineError, MapEngine};
use foundation::{LngLat, ScreenPoint};
use layers::{CATEGORY_STYLES, ID_PROPERTY};
use runtime::MessageQueue;

use crate::popup::popup_for;

/// Pointer input forwarded from the host, in screen pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PointerEvent {
    Move(ScreenPoint),
    /// Pointer left the map canvas.
    Leave,
    Click(ScreenPoint),
    MapMoveStart,
    /// Explicit dismissal of the detail popup.
    Close,
}

/// The event backing the open popup.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusedEvent {
    pub event: Event,
    pub anchor: LngLat,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Hovering,
    /// `hovering` tracks only the cursor affordance while a popup is open.
    Focused { focus: FocusedEvent, hovering: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    HoverStart,
    HoverEnd,
    Focus(FocusedEvent),
    /// A click on another symbol while focused.
    Refocus(FocusedEvent),
    Blur,
}

/// Pointer state machine over the visible category layers.
#[derive(Debug, Default)]
pub struct InteractionDispatcher {
    queue: MessageQueue<PointerEvent>,
    state: InteractionState,
    /// Last known pointer position over the canvas.
    pointer: Option<ScreenPoint>,
}

impl InteractionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn focused(&self) -> Option<&FocusedEvent> {
        match &self.state {
            InteractionState::Focused { focus, .. } => Some(focus),
            _ => None,
        }
    }

    pub fn push(&mut self, event: PointerEvent) {
        self.queue.push(event);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drops queued input and forgets focus, e.g. when the engine is released.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.state = InteractionState::Idle;
        self.pointer = None;
    }

    /// Re-runs the hover hit-test at the last pointer position, e.g. after
    /// layer visibility changed under a resting pointer.
    pub fn refresh_hover<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        catalogue: &[Event],
    ) -> Result<Option<Transition>, EngineError> {
        let over = self
            .pointer
            .is_some_and(|point| hit_test(engine, catalogue, point).is_some());
        self.set_hover(engine, over)
    }

    /// Drains queued pointer input in arrival order.
    pub fn dispatch<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        catalogue: &[Event],
    ) -> Result<Vec<Transition>, EngineError> {
        let mut transitions = Vec::new();
        while let Some(input) = self.queue.pop() {
            if let Some(t) = self.handle(engine, catalogue, input)? {
                tracing::trace!(?t, "interaction transition");
                transitions.push(t);
            }
        }
        Ok(transitions)
    }

    fn handle<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        catalogue: &[Event],
        input: PointerEvent,
    ) -> Result<Option<Transition>, EngineError> {
        match input {
            PointerEvent::Move(point) => {
                self.pointer = Some(point);
                let over = hit_test(engine, catalogue, point).is_some();
                self.set_hover(engine, over)
            }
            PointerEvent::Leave => {
                self.pointer = None;
                self.set_hover(engine, false)
            }
            PointerEvent::Click(point) => {
                self.pointer = Some(point);
                self.click(engine, catalogue, point)
            }
            PointerEvent::MapMoveStart | PointerEvent::Close => self.blur(engine),
        }
    }

    fn click<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        catalogue: &[Event],
        point: ScreenPoint,
    ) -> Result<Option<Transition>, EngineError> {
        match hit_test(engine, catalogue, point) {
            Some(event) => {
                let focus = FocusedEvent {
                    event: event.clone(),
                    anchor: event.position,
                };
                engine.open_popup(popup_for(event))?;
                engine.set_cursor(Cursor::Pointer)?;
                let was_focused = self.focused().is_some();
                self.state = InteractionState::Focused {
                    focus: focus.clone(),
                    hovering: true,
                };
                tracing::debug!(id = %focus.event.id, "event focused");
                Ok(Some(if was_focused {
                    Transition::Refocus(focus)
                } else {
                    Transition::Focus(focus)
                }))
            }
            None => self.blur(engine),
        }
    }

    fn set_hover<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        over: bool,
    ) -> Result<Option<Transition>, EngineError> {
        let hovering = match &self.state {
            InteractionState::Idle => false,
            InteractionState::Hovering => true,
            InteractionState::Focused { hovering, .. } => *hovering,
        };
        if hovering == over {
            return Ok(None);
        }

        engine.set_cursor(if over { Cursor::Pointer } else { Cursor::Default })?;
        match &mut self.state {
            InteractionState::Focused { hovering, .. } => *hovering = over,
            state => {
                *state = if over {
                    InteractionState::Hovering
                } else {
                    InteractionState::Idle
                }
            }
        }
        Ok(Some(if over {
            Transition::HoverStart
        } else {
            Transition::HoverEnd
        }))
    }

    fn blur<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
    ) -> Result<Option<Transition>, EngineError> {
        if self.focused().is_none() {
            return Ok(None);
        }
        engine.close_popup()?;
        engine.set_cursor(Cursor::Default)?;
        self.state = InteractionState::Idle;
        Ok(Some(Transition::Blur))
    }
}

/// Topmost event under `point` on a visible category layer.
fn hit_test<'c, E: MapEngine + ?Sized>(
    engine: &E,
    catalogue: &'c [Event],
    point: ScreenPoint,
) -> Option<&'c Event> {
    let visible: Vec<&str> = CATEGORY_STYLES
        .iter()
        .map(|s| s.layer_id)
        .filter(|id| engine.layer_visibility(id) == Some(true))
        .collect();
    if visible.is_empty() {
        return None;
    }
    engine
        .query_rendered_features(point, &visible)
        .iter()
        .find_map(|hit| {
            hit.feature
                .property_str(ID_PROPERTY)
                .and_then(|id| find_event(catalogue, id))
        })
}

#[cfg(test)]
mod tests {
    use super::{InteractionDispatcher, InteractionState, PointerEvent, Transition};
    use catalog::{Event, EventCategory};
    use engine::{Cursor, GlyphImage, HeadlessEngine, MapEngine, MapOptions};
    use foundation::{Camera, LngLat, Projection, ScreenPoint};
    use layers::{CATEGORY_STYLES, LayerSynchronizer, VisibilitySelection};
    use pretty_assertions::assert_eq;

    fn catalogue() -> Vec<Event> {
        vec![
            Event::new("c1", EventCategory::Conflict, "CONFLICT", LngLat::new(7.4, 9.0), "Clash")
                .with_country("Nigeria"),
            Event::new("c2", EventCategory::Conflict, "CONFLICT", LngLat::new(3.4, 6.5), "Raid"),
            Event::new("s1", EventCategory::Shipping, "VESSEL", LngLat::new(1.0, 4.0), "Tanker"),
        ]
    }

    fn mounted(events: &[Event], selection: &VisibilitySelection) -> HeadlessEngine {
        let mut engine = HeadlessEngine::new(MapOptions {
            access_token: "pk.test".to_string(),
            style_url: "mapbox://styles/mapbox/dark-v11".to_string(),
            camera: Camera::new(LngLat::new(5.0, 7.0), 4.0, [1024.0, 768.0]),
            projection: Projection::Globe,
        });
        for style in CATEGORY_STYLES.iter() {
            engine
                .add_image(style.icon_name, GlyphImage::new(1, 1, vec![255]).unwrap())
                .unwrap();
        }
        LayerSynchronizer::new()
            .sync(&mut engine, events, selection)
            .unwrap();
        engine
    }

    fn at(engine: &HeadlessEngine, event: &Event) -> ScreenPoint {
        engine.project(event.position).expect("event faces camera")
    }

    #[test]
    fn hover_toggles_cursor_affordance() {
        let events = catalogue();
        let mut engine = mounted(&events, &VisibilitySelection::all_visible());
        let mut d = InteractionDispatcher::new();

        d.push(PointerEvent::Move(at(&engine, &events[0])));
        assert_eq!(d.dispatch(&mut engine, &events).unwrap(), vec![Transition::HoverStart]);
        assert_eq!(engine.cursor(), Cursor::Pointer);
        assert_eq!(d.state(), &InteractionState::Hovering);

        // Still over a symbol: nothing changes.
        d.push(PointerEvent::Move(at(&engine, &events[1])));
        assert!(d.dispatch(&mut engine, &events).unwrap().is_empty());

        d.push(PointerEvent::Leave);
        assert_eq!(d.dispatch(&mut engine, &events).unwrap(), vec![Transition::HoverEnd]);
        assert_eq!(engine.cursor(), Cursor::Default);
        assert_eq!(d.state(), &InteractionState::Idle);
    }

    #[test]
    fn click_focuses_exactly_one_event_and_replaces_it() {
        let events = catalogue();
        let mut engine = mounted(&events, &VisibilitySelection::all_visible());
        let mut d = InteractionDispatcher::new();

        d.push(PointerEvent::Click(at(&engine, &events[0])));
        let first = d.dispatch(&mut engine, &events).unwrap();
        assert_eq!(first.len(), 1);
        let Transition::Focus(focus) = &first[0] else {
            panic!("expected focus, got {first:?}");
        };
        assert_eq!(focus.event, events[0]);
        assert_eq!(focus.anchor, events[0].position);
        assert_eq!(engine.popup().unwrap().position, events[0].position);
        assert!(engine.popup().unwrap().html.contains("CONFLICT • Nigeria"));

        d.push(PointerEvent::Click(at(&engine, &events[2])));
        let second = d.dispatch(&mut engine, &events).unwrap();
        assert!(matches!(&second[..], [Transition::Refocus(f)] if f.event.id == "s1"));
        assert_eq!(d.focused().unwrap().event.id, "s1");
        assert_eq!(engine.popup().unwrap().position, events[2].position);
    }

    #[test]
    fn hidden_symbols_cannot_be_clicked() {
        let events = catalogue();
        let selection = VisibilitySelection::from_enabled([EventCategory::Conflict]);
        let mut engine = mounted(&events, &selection);
        let mut d = InteractionDispatcher::new();

        assert_eq!(engine.rendered_features().len(), 2);
        d.push(PointerEvent::Click(at(&engine, &events[2])));
        d.push(PointerEvent::Move(at(&engine, &events[2])));
        assert!(d.dispatch(&mut engine, &events).unwrap().is_empty());
        assert_eq!(d.state(), &InteractionState::Idle);
        assert!(engine.popup().is_none());
    }

    #[test]
    fn click_elsewhere_move_and_close_all_blur() {
        let events = catalogue();
        let mut engine = mounted(&events, &VisibilitySelection::all_visible());
        let empty = ScreenPoint::new(2.0, 2.0);

        for dismiss in [
            PointerEvent::Click(empty),
            PointerEvent::MapMoveStart,
            PointerEvent::Close,
        ] {
            let mut d = InteractionDispatcher::new();
            d.push(PointerEvent::Click(at(&engine, &events[1])));
            d.push(dismiss);
            let transitions = d.dispatch(&mut engine, &events).unwrap();
            assert!(matches!(transitions.last(), Some(Transition::Blur)), "{dismiss:?}");
            assert_eq!(d.state(), &InteractionState::Idle);
            assert!(engine.popup().is_none());
            assert_eq!(engine.cursor(), Cursor::Default);
        }
    }

    #[test]
    fn empty_clicks_while_idle_are_ignored() {
        let events = catalogue();
        let mut engine = mounted(&events, &VisibilitySelection::all_visible());
        let before = engine.mutation_count();
        let mut d = InteractionDispatcher::new();
        d.push(PointerEvent::Click(ScreenPoint::new(2.0, 2.0)));
        d.push(PointerEvent::Close);
        d.push(PointerEvent::MapMoveStart);
        assert!(d.dispatch(&mut engine, &events).unwrap().is_empty());
        assert_eq!(engine.mutation_count(), before);
    }

    #[test]
    fn hover_while_focused_only_moves_the_cursor() {
        let events = catalogue();
        let mut engine = mounted(&events, &VisibilitySelection::all_visible());
        let mut d = InteractionDispatcher::new();
        d.push(PointerEvent::Click(at(&engine, &events[0])));
        d.push(PointerEvent::Leave);
        let transitions = d.dispatch(&mut engine, &events).unwrap();

        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[1], Transition::HoverEnd);
        assert_eq!(d.focused().unwrap().event.id, "c1");
        assert!(engine.popup().is_some());
        assert_eq!(engine.cursor(), Cursor::Default);
    }

    #[test]
    fn hiding_the_hovered_layer_drops_the_pointer_cursor() {
        let events = catalogue();
        let mut engine = mounted(&events, &VisibilitySelection::all_visible());
        let mut d = InteractionDispatcher::new();
        d.push(PointerEvent::Move(at(&engine, &events[2])));
        d.dispatch(&mut engine, &events).unwrap();
        assert_eq!(engine.cursor(), Cursor::Pointer);

        // Another category going away leaves the hover alone.
        engine.set_layer_visibility("conflict-symbols", false).unwrap();
        assert_eq!(d.refresh_hover(&mut engine, &events).unwrap(), None);
        assert_eq!(d.state(), &InteractionState::Hovering);

        engine.set_layer_visibility("shipping-symbols", false).unwrap();
        assert_eq!(
            d.refresh_hover(&mut engine, &events).unwrap(),
            Some(Transition::HoverEnd)
        );
        assert_eq!(d.state(), &InteractionState::Idle);
        assert_eq!(engine.cursor(), Cursor::Default);

        engine.set_layer_visibility("shipping-symbols", true).unwrap();
        assert_eq!(
            d.refresh_hover(&mut engine, &events).unwrap(),
            Some(Transition::HoverStart)
        );
    }

    #[test]
    fn refresh_without_a_pointer_is_a_no_op() {
        let events = catalogue();
        let mut engine = mounted(&events, &VisibilitySelection::all_visible());
        let before = engine.mutation_count();
        let mut d = InteractionDispatcher::new();
        d.push(PointerEvent::Move(at(&engine, &events[0])));
        d.push(PointerEvent::Leave);
        d.dispatch(&mut engine, &events).unwrap();

        assert_eq!(d.refresh_hover(&mut engine, &events).unwrap(), None);
        assert_eq!(engine.mutation_count(), before + 2);
    }

    #[test]
    fn reset_forgets_focus_and_queue() {
        let events = catalogue();
        let mut engine = mounted(&events, &VisibilitySelection::all_visible());
        let mut d = InteractionDispatcher::new();
        d.push(PointerEvent::Click(at(&engine, &events[0])));
        d.dispatch(&mut engine, &events).unwrap();
        d.push(PointerEvent::Close);

        d.reset();
        assert_eq!(d.pending(), 0);
        assert!(d.focused().is_none());
    }
}
