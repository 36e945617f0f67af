use serde::{Deserialize, Serialize};

/// The closed set of event categories.
///
/// Declaration order is the layer creation order and must not change:
/// later categories draw above earlier ones.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Conflict,
    Protest,
    Shipping,
    Air,
    Infrastructure,
    Cultural,
}

impl EventCategory {
    pub const COUNT: usize = 6;

    pub const ALL: [EventCategory; Self::COUNT] = [
        EventCategory::Conflict,
        EventCategory::Protest,
        EventCategory::Shipping,
        EventCategory::Air,
        EventCategory::Infrastructure,
        EventCategory::Cultural,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EventCategory::Conflict => "conflict",
            EventCategory::Protest => "protest",
            EventCategory::Shipping => "shipping",
            EventCategory::Air => "air",
            EventCategory::Infrastructure => "infrastructure",
            EventCategory::Cultural => "cultural",
        }
    }

    /// Parses a category name, accepting the legacy plural/short spellings
    /// still emitted by older feeds.
    pub fn parse(raw: &str) -> Option<Self> {
        let c = match raw.trim().to_ascii_lowercase().as_str() {
            "conflict" | "conflicts" => EventCategory::Conflict,
            "protest" | "protests" => EventCategory::Protest,
            "shipping" => EventCategory::Shipping,
            "air" => EventCategory::Air,
            "infrastructure" | "infra" => EventCategory::Infrastructure,
            "cultural" | "culture" => EventCategory::Cultural,
            _ => return None,
        };
        Some(c)
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown event category: {s:?}"))
    }
}
