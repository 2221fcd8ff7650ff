use weather_core::{ReportView, Screen};

/// Text for one screen snapshot.
pub fn screen(screen: &Screen) -> String {
    match screen {
        Screen::Idle => "Enter a city to look up the weather.".to_string(),
        Screen::Loading => "Loading...".to_string(),
        Screen::Error(message) => message.clone(),
        Screen::Report(view) => report(view),
    }
}

fn report(view: &ReportView) -> String {
    let labels = view.labels;
    let mut lines = vec![
        view.location.clone(),
        format!("{}  {}", view.temperature, view.condition),
    ];

    if let Some(url) = &view.icon_url {
        lines.push(url.clone());
    }

    lines.push(format!(
        "{}: {}   {}: {}",
        labels.humidity, view.humidity, labels.wind, view.wind
    ));
    lines.push(format!(
        "{}: {}   {}: {}   {}: {}",
        labels.feels_like,
        view.feels_like,
        labels.sunrise,
        view.sunrise,
        labels.sunset,
        view.sunset
    ));

    lines.join("\n")
}
