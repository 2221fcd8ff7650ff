//! Fetch state machine for a single lookup screen.
//!
//! [`FetchController`] owns the [`FetchState`] and is the only writer. Readers take
//! snapshots with [`FetchController::state`] or subscribe to every change with
//! [`FetchController::subscribe`].

use serde::{Deserialize, Serialize};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    config::DEFAULT_CITY,
    error::FetchError,
    model::{Language, WeatherQuery, WeatherReport},
    provider::WeatherProvider,
};

/// Everything the presentation layer needs to draw the screen.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState {
    pub city_input: String,
    pub language: Language,
    pub is_loading: bool,
    pub last_report: Option<WeatherReport>,
    pub last_error: Option<FetchError>,
}

impl Default for FetchState {
    fn default() -> Self {
        Self::with_city(DEFAULT_CITY)
    }
}

impl FetchState {
    pub fn with_city(city: &str) -> Self {
        Self {
            city_input: city.to_string(),
            language: Language::En,
            is_loading: false,
            last_report: None,
            last_error: None,
        }
    }
}

/// Which of several overlapping responses gets written into the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseOrdering {
    /// Every response is applied as it arrives; the last to arrive wins.
    #[default]
    LastArrival,
    /// Only the response to the most recently issued fetch is applied.
    LatestIssued,
}

#[derive(Debug, Clone)]
pub struct FetchController {
    provider: Arc<dyn WeatherProvider>,
    state: Arc<watch::Sender<FetchState>>,
    issued: Arc<AtomicU64>,
    ordering: ResponseOrdering,
}

impl FetchController {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self::with_state(provider, FetchState::default())
    }

    pub fn with_state(provider: Arc<dyn WeatherProvider>, initial: FetchState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            provider,
            state: Arc::new(state),
            issued: Arc::new(AtomicU64::new(0)),
            ordering: ResponseOrdering::default(),
        }
    }

    pub fn with_ordering(mut self, ordering: ResponseOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> FetchState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state.subscribe()
    }

    /// Replace the city input verbatim. Never touches the network.
    pub fn set_city_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_modify(|s| s.city_input = text);
    }

    /// Look up the weather for the current city input and reduce the outcome into
    /// the state. The outcome is returned as well.
    pub async fn fetch_weather(&self) -> Result<WeatherReport, FetchError> {
        let input = self.state.borrow().city_input.clone();

        let Some(query) = WeatherQuery::from_input(&input) else {
            debug!("city input is blank; not issuing a request");
            self.state.send_modify(|s| s.last_error = Some(FetchError::EmptyCity));
            return Err(FetchError::EmptyCity);
        };

        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.last_error = None;
            s.language = query.language();
        });

        let guard = LoadingGuard::new(&self.state);

        info!(city = query.city(), lang = %query.language(), generation, "fetching weather");
        let outcome = match self.provider.get_weather(&query).await {
            Ok(report) => Ok(report),
            Err(err) => {
                warn!(city = query.city(), generation, "weather lookup failed: {err:#}");
                Err(FetchError::Unavailable)
            }
        };

        guard.disarm();

        if self.ordering == ResponseOrdering::LatestIssued
            && generation != self.issued.load(Ordering::SeqCst)
        {
            debug!(generation, "discarding response to a superseded fetch");
            return outcome;
        }

        self.state.send_modify(|s| {
            match &outcome {
                Ok(report) => s.last_report = Some(report.clone()),
                Err(err) => s.last_error = Some(*err),
            }
            s.is_loading = false;
        });

        outcome
    }
}

/// Clears `is_loading` if a fetch is dropped before its response arrives.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<FetchState>,
    armed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn new(state: &'a watch::Sender<FetchState>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_modify(|s| s.is_loading = false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::{collections::HashMap, sync::Mutex, time::Duration};
    use tokio::sync::oneshot;

    fn report(name: &str, temp: f64) -> WeatherReport {
        WeatherReport {
            location_name: name.to_string(),
            temperature_c: temp,
            feels_like_c: temp - 2.0,
            humidity_pct: 80,
            wind_speed_mps: 4.1,
            condition: "light snow".to_string(),
            condition_icon: "13d".to_string(),
            sunrise_unix: 1_700_000_000,
            sunset_unix: 1_700_030_000,
        }
    }

    /// Answers from a fixed table and records every query it receives.
    #[derive(Debug, Default)]
    struct TableProvider {
        reports: HashMap<String, WeatherReport>,
        calls: Mutex<Vec<WeatherQuery>>,
    }

    impl TableProvider {
        fn with(city: &str, report: WeatherReport) -> Self {
            let mut reports = HashMap::new();
            reports.insert(city.to_string(), report);
            Self {
                reports,
                calls: Mutex::default(),
            }
        }

        fn calls(&self) -> Vec<WeatherQuery> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl WeatherProvider for TableProvider {
        async fn get_weather(&self, query: &WeatherQuery) -> anyhow::Result<WeatherReport> {
            self.calls.lock().expect("calls lock").push(query.clone());
            self.reports
                .get(query.city())
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("city not found"))
        }
    }

    /// Each call waits until the test releases it with a chosen outcome.
    #[derive(Debug, Default)]
    struct GatedProvider {
        gates: Mutex<HashMap<String, oneshot::Receiver<anyhow::Result<WeatherReport>>>>,
    }

    impl GatedProvider {
        fn gate(&self, city: &str) -> oneshot::Sender<anyhow::Result<WeatherReport>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().expect("gates lock").insert(city.to_string(), rx);
            tx
        }
    }

    #[async_trait]
    impl WeatherProvider for GatedProvider {
        async fn get_weather(&self, query: &WeatherQuery) -> anyhow::Result<WeatherReport> {
            let gate = self
                .gates
                .lock()
                .expect("gates lock")
                .remove(query.city())
                .ok_or_else(|| anyhow::anyhow!("no gate for {}", query.city()))?;
            gate.await?
        }
    }

    async fn wait_until(rx: &mut watch::Receiver<FetchState>, pred: impl Fn(&FetchState) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| pred(s)))
            .await
            .expect("state change in time")
            .expect("controller alive");
    }

    /// Start a fetch for `city` and wait until its request is in flight.
    async fn start_fetch(
        controller: &FetchController,
        city: &str,
    ) -> tokio::task::JoinHandle<Result<WeatherReport, FetchError>> {
        let mut rx = controller.subscribe();
        let before = controller.issued.load(Ordering::SeqCst);
        controller.set_city_input(city);

        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.fetch_weather().await }
        });

        let issued = controller.issued.clone();
        wait_until(&mut rx, move |s| s.is_loading && issued.load(Ordering::SeqCst) > before).await;
        task
    }

    #[test]
    fn initial_state_defaults_to_moscow_in_english() {
        let controller = FetchController::new(Arc::new(TableProvider::default()));
        let state = controller.state();

        assert_eq!(state.city_input, "Moscow");
        assert_eq!(state.language, Language::En);
        assert!(!state.is_loading);
        assert!(state.last_report.is_none());
        assert!(state.last_error.is_none());
    }

    #[test]
    fn set_city_input_is_verbatim() {
        let controller = FetchController::new(Arc::new(TableProvider::default()));
        controller.set_city_input("  Kazan ");
        assert_eq!(controller.state().city_input, "  Kazan ");
    }

    #[tokio::test]
    async fn blank_input_sets_error_without_request() {
        let provider = Arc::new(TableProvider::default());
        let controller = FetchController::new(provider.clone());

        for input in ["", " ", "\t\n  "] {
            controller.set_city_input(input);
            let outcome = controller.fetch_weather().await;

            assert_eq!(outcome, Err(FetchError::EmptyCity));
            let state = controller.state();
            assert_eq!(state.last_error, Some(FetchError::EmptyCity));
            assert_eq!(
                state.last_error.map(|e| e.to_string()).as_deref(),
                Some("Error: The name of the city cannot be empty.")
            );
            assert!(!state.is_loading);
        }

        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn successful_fetch_stores_report() {
        let provider = Arc::new(TableProvider::with("Moscow", report("Moscow", 3.2)));
        let controller = FetchController::new(provider.clone());

        let outcome = controller.fetch_weather().await;
        assert_eq!(outcome, Ok(report("Moscow", 3.2)));

        let state = controller.state();
        assert_eq!(state.last_report, Some(report("Moscow", 3.2)));
        assert_eq!(state.language, Language::En);
        assert!(state.last_error.is_none());
        assert!(!state.is_loading);

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].city(), "Moscow");
        assert_eq!(calls[0].language(), Language::En);
    }

    #[tokio::test]
    async fn cyrillic_input_is_trimmed_and_requested_in_russian() {
        let provider = Arc::new(TableProvider::with("Москва", report("Москва", -1.0)));
        let controller = FetchController::new(provider.clone());

        controller.set_city_input("  Москва  ");
        controller.fetch_weather().await.expect("known city");

        assert_eq!(controller.state().language, Language::Ru);
        let calls = provider.calls();
        assert_eq!(calls[0].city(), "Москва");
        assert_eq!(calls[0].language().as_str(), "ru");
    }

    #[tokio::test]
    async fn failure_keeps_previous_report() {
        let provider = Arc::new(TableProvider::with("Moscow", report("Moscow", 3.2)));
        let controller = FetchController::new(provider);

        controller.fetch_weather().await.expect("known city");
        controller.set_city_input("Atlantis");
        let outcome = controller.fetch_weather().await;

        assert_eq!(outcome, Err(FetchError::Unavailable));
        let state = controller.state();
        assert_eq!(state.last_error, Some(FetchError::Unavailable));
        assert_eq!(state.last_report, Some(report("Moscow", 3.2)));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn new_fetch_clears_previous_error() {
        let provider = Arc::new(TableProvider::with("Moscow", report("Moscow", 3.2)));
        let controller = FetchController::new(provider);

        controller.set_city_input("");
        let _ = controller.fetch_weather().await;
        assert!(controller.state().last_error.is_some());

        controller.set_city_input("Moscow");
        controller.fetch_weather().await.expect("known city");
        assert!(controller.state().last_error.is_none());
    }

    #[tokio::test]
    async fn loading_is_visible_while_in_flight() {
        let provider = Arc::new(GatedProvider::default());
        let release = provider.gate("Moscow");
        let controller = FetchController::new(provider);

        let task = start_fetch(&controller, "Moscow").await;
        let state = controller.state();
        assert!(state.is_loading);
        assert!(state.last_error.is_none());

        release.send(Ok(report("Moscow", 3.2))).expect("fetch waiting");
        task.await.expect("task").expect("released with success");
        assert!(!controller.state().is_loading);
    }

    #[tokio::test]
    async fn dropped_fetch_does_not_leave_loading_set() {
        let provider = Arc::new(GatedProvider::default());
        let _release = provider.gate("Moscow");
        let controller = FetchController::new(provider);

        let task = start_fetch(&controller, "Moscow").await;
        task.abort();
        let _ = task.await;

        let state = controller.state();
        assert!(!state.is_loading);
        assert!(state.last_report.is_none());
    }

    #[tokio::test]
    async fn last_arrival_wins_by_default() {
        let provider = Arc::new(GatedProvider::default());
        let release_a = provider.gate("Oslo");
        let release_b = provider.gate("Paris");
        let controller = FetchController::new(provider);

        let first = start_fetch(&controller, "Oslo").await;
        let second = start_fetch(&controller, "Paris").await;

        // The later request answers first; the earlier one arrives last and wins.
        release_b.send(Ok(report("Paris", 12.0))).expect("fetch waiting");
        second.await.expect("task").expect("success");
        release_a.send(Ok(report("Oslo", 1.0))).expect("fetch waiting");
        first.await.expect("task").expect("success");

        let state = controller.state();
        assert_eq!(state.last_report, Some(report("Oslo", 1.0)));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn late_failure_overrides_earlier_success() {
        let provider = Arc::new(GatedProvider::default());
        let release_a = provider.gate("Oslo");
        let release_b = provider.gate("Paris");
        let controller = FetchController::new(provider);

        let first = start_fetch(&controller, "Oslo").await;
        let second = start_fetch(&controller, "Paris").await;

        release_a.send(Ok(report("Oslo", 1.0))).expect("fetch waiting");
        first.await.expect("task").expect("success");
        release_b.send(Err(anyhow::anyhow!("timeout"))).expect("fetch waiting");
        let _ = second.await.expect("task");

        let state = controller.state();
        assert_eq!(state.last_error, Some(FetchError::Unavailable));
        assert_eq!(state.last_report, Some(report("Oslo", 1.0)));
    }

    #[tokio::test]
    async fn latest_issued_discards_stale_response() {
        let provider = Arc::new(GatedProvider::default());
        let release_a = provider.gate("Oslo");
        let release_b = provider.gate("Paris");
        let controller =
            FetchController::new(provider).with_ordering(ResponseOrdering::LatestIssued);

        let first = start_fetch(&controller, "Oslo").await;
        let second = start_fetch(&controller, "Paris").await;

        release_b.send(Ok(report("Paris", 12.0))).expect("fetch waiting");
        second.await.expect("task").expect("success");
        release_a.send(Ok(report("Oslo", 1.0))).expect("fetch waiting");
        // The stale caller still sees its own outcome.
        assert_eq!(first.await.expect("task"), Ok(report("Oslo", 1.0)));

        let state = controller.state();
        assert_eq!(state.last_report, Some(report("Paris", 12.0)));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn subscribers_see_loading_then_result() {
        let provider = Arc::new(GatedProvider::default());
        let release = provider.gate("Moscow");
        let controller = FetchController::new(provider);
        let mut rx = controller.subscribe();

        let task = start_fetch(&controller, "Moscow").await;
        release.send(Ok(report("Moscow", 3.2))).expect("fetch waiting");

        wait_until(&mut rx, |s| !s.is_loading && s.last_report.is_some()).await;
        task.await.expect("task").expect("success");
    }
}
