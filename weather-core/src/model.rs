/// Language used both for the API's `lang` parameter and for display labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    En,
    Ru,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
        }
    }

    /// `Ru` if the text contains any letter in `а..=я` or `А..=Я`, otherwise `En`.
    ///
    /// This is a plain code point range test, not a locale-aware script check
    /// (`ё`/`Ё` sit outside both ranges and do not count).
    pub fn detect(text: &str) -> Self {
        let cyrillic = text
            .chars()
            .any(|c| ('а'..='я').contains(&c) || ('А'..='Я').contains(&c));

        if cyrillic { Language::Ru } else { Language::En }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated lookup: trimmed, non-empty city plus the language derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    city: String,
    language: Language,
}

impl WeatherQuery {
    /// Returns `None` when the input is empty or whitespace only.
    pub fn from_input(input: &str) -> Option<Self> {
        let city = input.trim();
        if city.is_empty() {
            return None;
        }

        Some(Self {
            city: city.to_owned(),
            language: Language::detect(city),
        })
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

/// Current conditions for one location, as returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub location_name: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub condition: String,
    pub condition_icon: String,
    /// Unix seconds, UTC.
    pub sunrise_unix: i64,
    /// Unix seconds, UTC.
    pub sunset_unix: i64,
}
