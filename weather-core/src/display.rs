//! Presentation helpers: localised labels, unit formatting and the screen state
//! derived from a [`FetchState`] snapshot.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

use crate::{
    controller::FetchState,
    model::{Language, WeatherReport},
};

const ICON_URL_BASE: &str = "https://openweathermap.org/img/wn";

/// Field captions for one language.
#[derive(Debug, PartialEq, Eq)]
pub struct Labels {
    pub humidity: &'static str,
    pub wind: &'static str,
    pub feels_like: &'static str,
    pub sunrise: &'static str,
    pub sunset: &'static str,
    pub wind_unit: &'static str,
}

const EN: Labels = Labels {
    humidity: "Humidity",
    wind: "Wind",
    feels_like: "Feels like",
    sunrise: "Sunrise",
    sunset: "Sunset",
    wind_unit: "m/s",
};

const RU: Labels = Labels {
    humidity: "Влажность",
    wind: "Ветер",
    feels_like: "Ощущается",
    sunrise: "Восход",
    sunset: "Закат",
    wind_unit: "м/с",
};

impl Labels {
    pub fn for_language(language: Language) -> &'static Labels {
        match language {
            Language::En => &EN,
            Language::Ru => &RU,
        }
    }
}

/// Nearest integer, halves rounded towards positive infinity.
pub fn round_half_up(value: f64) -> i64 {
    // `(value + 0.5).floor()` would round 0.49999999999999994 up.
    let floor = value.floor();
    let rounded = if value - floor >= 0.5 { floor + 1.0 } else { floor };
    rounded as i64
}

pub fn format_temperature(celsius: f64) -> String {
    format!("{}°C", round_half_up(celsius))
}

/// Upper-cases the first character, leaving the rest untouched.
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `HH:MM` wall-clock time of a Unix timestamp in the given time zone.
pub fn format_clock<Tz>(unix_seconds: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    DateTime::from_timestamp(unix_seconds, 0)
        .map(|utc| utc.with_timezone(tz).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

/// Condition icon at the provider's CDN, if the report names one.
pub fn icon_url(icon: &str) -> Option<String> {
    (!icon.is_empty()).then(|| format!("{ICON_URL_BASE}/{icon}@4x.png"))
}

/// A report with every field already formatted for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportView {
    pub labels: &'static Labels,
    pub location: String,
    pub temperature: String,
    pub condition: String,
    pub icon_url: Option<String>,
    pub humidity: String,
    pub wind: String,
    pub feels_like: String,
    pub sunrise: String,
    pub sunset: String,
}

impl ReportView {
    pub fn new<Tz>(report: &WeatherReport, language: Language, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let labels = Labels::for_language(language);

        Self {
            labels,
            location: report.location_name.clone(),
            temperature: format_temperature(report.temperature_c),
            condition: capitalize_first(&report.condition),
            icon_url: icon_url(&report.condition_icon),
            humidity: format!("{}%", report.humidity_pct),
            wind: format!("{} {}", round_half_up(report.wind_speed_mps), labels.wind_unit),
            feels_like: format_temperature(report.feels_like_c),
            sunrise: format_clock(report.sunrise_unix, tz),
            sunset: format_clock(report.sunset_unix, tz),
        }
    }
}

/// What the screen shows for a given state.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    /// Nothing fetched yet.
    Idle,
    Loading,
    Error(String),
    Report(ReportView),
}

impl Screen {
    /// Loading takes precedence over an error, and an error over a report.
    pub fn from_state<Tz>(state: &FetchState, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        if state.is_loading {
            Screen::Loading
        } else if let Some(err) = &state.last_error {
            Screen::Error(err.to_string())
        } else if let Some(report) = &state.last_report {
            Screen::Report(ReportView::new(report, state.language, tz))
        } else {
            Screen::Idle
        }
    }
}
