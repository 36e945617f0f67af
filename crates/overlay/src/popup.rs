use catalog::Event;
use engine::{Popup, PopupAnchor};
use layers::{ACCENT_COLOR, style_for};

/// Pixel offset applied above the anchor point.
pub const POPUP_OFFSET: [f64; 2] = [0.0, -6.0];

/// The fields shown on a detail card, already formatted but not escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupContent {
    pub tag: &'static str,
    pub timestamp: Option<String>,
    /// `KIND • COUNTRY`, or just the kind when the country is unknown.
    pub headline: String,
    pub title: String,
    pub subtitle: Option<String>,
}

impl PopupContent {
    pub fn for_event(event: &Event) -> Self {
        let headline = match event.country.as_deref() {
            Some(country) if !country.is_empty() => format!("{} • {}", event.kind, country),
            _ => event.kind.clone(),
        };
        Self {
            tag: style_for(event.category).label,
            timestamp: event.timestamp.map(|ts| ts.short_label()),
            headline,
            title: event.title.clone(),
            subtitle: event.subtitle.clone().filter(|s| !s.is_empty()),
        }
    }

    pub fn to_html(&self) -> String {
        let mut html = String::with_capacity(512);
        html.push_str(r#"<div class="protocol-popup">"#);
        html.push_str(r#"<div class="protocol-popup__header">"#);
        html.push_str(&format!(
            r#"<div class="protocol-popup__tag" style="color:{ACCENT_COLOR}">{}</div>"#,
            escape_html(self.tag)
        ));
        html.push_str(&format!(
            r#"<div class="protocol-popup__time">{}</div>"#,
            escape_html(self.timestamp.as_deref().unwrap_or(""))
        ));
        html.push_str("</div>");
        html.push_str(&format!(
            r#"<div class="protocol-popup__headline">{}</div>"#,
            escape_html(&self.headline)
        ));
        html.push_str(&format!(
            r#"<div class="protocol-popup__title">{}</div>"#,
            escape_html(&self.title)
        ));
        if let Some(subtitle) = &self.subtitle {
            html.push_str(&format!(
                r#"<div class="protocol-popup__subtitle">{}</div>"#,
                escape_html(subtitle)
            ));
        }
        html.push_str("</div>");
        html
    }
}

/// Anchored detail card for `event`: bottom anchor, no close button, closes
/// when the map moves.
pub fn popup_for(event: &Event) -> Popup {
    Popup {
        position: event.position,
        html: PopupContent::for_event(event).to_html(),
        anchor: PopupAnchor::Bottom,
        offset: POPUP_OFFSET,
        close_button: false,
        close_on_move: true,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
