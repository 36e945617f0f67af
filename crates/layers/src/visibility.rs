use catalog::EventCategory;
use serde::{Deserialize, Serialize};

/// Total category → visible mapping.
///
/// Backed by a fixed array so every category always has a flag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisibilitySelection {
    flags: [bool; EventCategory::COUNT],
}

impl Default for VisibilitySelection {
    /// Sidebar default: conflict, protest and shipping on; the rest off.
    fn default() -> Self {
        Self::from_enabled([
            EventCategory::Conflict,
            EventCategory::Protest,
            EventCategory::Shipping,
        ])
    }
}

impl VisibilitySelection {
    pub fn all_visible() -> Self {
        Self {
            flags: [true; EventCategory::COUNT],
        }
    }

    pub fn all_hidden() -> Self {
        Self {
            flags: [false; EventCategory::COUNT],
        }
    }

    /// Exactly the given categories visible.
    pub fn from_enabled(enabled: impl IntoIterator<Item = EventCategory>) -> Self {
        let mut s = Self::all_hidden();
        for c in enabled {
            s.flags[c.index()] = true;
        }
        s
    }

    pub fn is_visible(&self, category: EventCategory) -> bool {
        self.flags[category.index()]
    }

    /// Returns `true` if the flag changed.
    pub fn set(&mut self, category: EventCategory, visible: bool) -> bool {
        let slot = &mut self.flags[category.index()];
        let changed = *slot != visible;
        *slot = visible;
        changed
    }

    /// Flips one category and returns its new flag.
    pub fn toggle(&mut self, category: EventCategory) -> bool {
        let slot = &mut self.flags[category.index()];
        *slot = !*slot;
        *slot
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventCategory, bool)> + '_ {
        EventCategory::ALL.into_iter().map(|c| (c, self.flags[c.index()]))
    }

    pub fn enabled(&self) -> impl Iterator<Item = EventCategory> + '_ {
        self.iter().filter(|(_, v)| *v).map(|(c, _)| c)
    }

    /// Categories whose flag differs between `self` and `other`.
    pub fn changed_from(&self, other: &Self) -> Vec<EventCategory> {
        EventCategory::ALL
            .into_iter()
            .filter(|c| self.flags[c.index()] != other.flags[c.index()])
            .collect()
    }
}
