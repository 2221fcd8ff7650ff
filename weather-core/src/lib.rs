//! Core library for the `weather` city lookup.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather client abstraction and its OpenWeather implementation
//! - The fetch state machine driving a lookup screen
//! - Display helpers turning state snapshots into renderable text
//!
//! It is used by `weather-cli`, but can also be reused by other front ends.

pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod model;
pub mod provider;

pub use config::Config;
pub use controller::{FetchController, FetchState, ResponseOrdering};
pub use display::{ReportView, Screen};
pub use error::FetchError;
pub use model::{Language, WeatherQuery, WeatherReport};
pub use provider::{WeatherProvider, provider_from_config};
