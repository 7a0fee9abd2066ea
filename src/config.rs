use crate::deck::DeckSettings;
use crate::gesture::GestureConfig;
use gloo_storage::errors::StorageError;
use gloo_storage::{LocalStorage, Storage};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

const STORAGE_KEY: &str = "swipe_deck_config";
const CARD_MARGIN: f64 = 24.0;
const MIN_CARD_WIDTH: f64 = 200.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub feed_per_page: u32,
    pub liked_per_page: u32,
    /// How many upcoming cards get their first photo warmed.
    pub prefetch_window: usize,
    pub request_timeout_ms: u32,
    pub gesture: GestureConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            feed_per_page: 10,
            liked_per_page: 10,
            prefetch_window: 10,
            request_timeout_ms: 10_000,
            gesture: GestureConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn deck_settings(&self) -> DeckSettings {
        DeckSettings {
            prefetch_window: self.prefetch_window,
            gesture: self.gesture,
        }
    }

    /// Sizes cards to the viewport, leaving a margin on either side.
    pub fn fit_to_viewport(mut self, viewport_width: f64) -> Self {
        if viewport_width.is_finite() && viewport_width > 0.0 {
            self.gesture.card_width = (viewport_width - CARD_MARGIN).max(MIN_CARD_WIDTH);
        }
        self
    }
}

pub fn load_config() -> AppConfig {
    match LocalStorage::get::<AppConfig>(STORAGE_KEY) {
        Ok(config) => config,
        Err(StorageError::KeyNotFound(_)) => {
            debug!("No stored config, writing defaults");
            let config = AppConfig::default();
            save_config(&config);
            config
        }
        Err(err) => {
            warn!("Falling back to default config: {}", err);
            AppConfig::default()
        }
    }
}

pub fn save_config(config: &AppConfig) {
    if let Err(err) = LocalStorage::set(STORAGE_KEY, config) {
        warn!("Failed to persist config: {}", err);
    }
}
