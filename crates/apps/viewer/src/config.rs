use catalog::EventCategory;
use clap::Parser;
use foundation::LngLat;
use layers::VisibilitySelection;
use overlay::{SurfaceConfig, DEFAULT_STYLE_URL};

#[derive(Parser, Debug)]
#[command(author, version, about = "Mounts the event overlay on a headless globe and prints its state")]
pub struct Args {
    /// Map engine access token
    #[arg(long, env = "PROTOCOL_MAPBOX_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Base map style URL
    #[arg(long, env = "PROTOCOL_MAP_STYLE", default_value = DEFAULT_STYLE_URL)]
    pub style_url: String,

    /// Remote event catalogue; the built-in fixture is used when absent
    #[arg(long, env = "PROTOCOL_CATALOG_URL")]
    pub catalog_url: Option<String>,

    /// Auxiliary news feed for the ticker
    #[arg(long, env = "PROTOCOL_FEED_URL")]
    pub feed_url: Option<String>,

    /// Directory or http(s) base URL holding the category icons
    #[arg(long, env = "PROTOCOL_ICON_ROOT", default_value = "assets/protocol")]
    pub icon_root: String,

    /// Ticker refresh interval
    #[arg(long, default_value_t = 60)]
    pub feed_interval_secs: u64,

    /// Initially visible categories, comma separated (e.g. conflict,air)
    #[arg(long, value_parser = parse_categories)]
    pub visible: Option<CategoryList>,

    /// Categories to toggle after the first paint
    #[arg(long, value_parser = parse_categories)]
    pub toggle: Option<CategoryList>,

    /// Simulated click at LNG,LAT after the first paint
    #[arg(long, value_parser = parse_lng_lat, allow_hyphen_values = true)]
    pub click: Option<LngLat>,

    /// Keep the session running this long before tearing down
    #[arg(long, default_value_t = 0)]
    pub run_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryList(pub Vec<EventCategory>);

impl Args {
    pub fn surface_config(&self) -> SurfaceConfig {
        SurfaceConfig {
            access_token: self.access_token.clone(),
            style_url: self.style_url.clone(),
            ..SurfaceConfig::default()
        }
    }

    pub fn initial_selection(&self) -> VisibilitySelection {
        match &self.visible {
            Some(list) => VisibilitySelection::from_enabled(list.0.iter().copied()),
            None => VisibilitySelection::default(),
        }
    }

    pub fn toggles(&self) -> &[EventCategory] {
        self.toggle.as_ref().map(|l| l.0.as_slice()).unwrap_or(&[])
    }
}

fn parse_categories(s: &str) -> Result<CategoryList, String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| EventCategory::parse(part).ok_or_else(|| format!("unknown category {part:?}")))
        .collect::<Result<Vec<_>, _>>()
        .map(CategoryList)
}

fn parse_lng_lat(s: &str) -> Result<LngLat, String> {
    let (lng, lat) = s
        .split_once(',')
        .ok_or_else(|| "expected LNG,LAT".to_string())?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
    LngLat::try_new(lng, lat).map_err(|e| e.to_string())
}
