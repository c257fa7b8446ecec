use crate::data_manager::{DataManager, DataResult};
use crate::models::{Preferences, Theme};
use std::sync::Mutex;
use tracing::warn;

/// Where preferences are persisted between runs.
pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> DataResult<Preferences>;
    fn save(&self, preferences: &Preferences) -> DataResult<()>;
}

impl PreferenceStore for DataManager {
    fn load(&self) -> DataResult<Preferences> {
        self.load_preferences()
    }

    fn save(&self, preferences: &Preferences) -> DataResult<()> {
        self.save_preferences(preferences)
    }
}

#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    stored: Mutex<Option<Preferences>>,
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> DataResult<Preferences> {
        Ok(self
            .stored
            .lock()
            .map(|stored| stored.clone().unwrap_or_default())
            .unwrap_or_default())
    }

    fn save(&self, preferences: &Preferences) -> DataResult<()> {
        if let Ok(mut stored) = self.stored.lock() {
            *stored = Some(preferences.clone());
        }
        Ok(())
    }
}

/// Application-wide view state: theme, language and whether the user is
/// logged in. Passed by reference to whatever renders it.
pub struct AppContext {
    preferences: Preferences,
    store: Box<dyn PreferenceStore>,
}

impl AppContext {
    /// Reads persisted preferences, falling back to defaults when the store
    /// cannot be read.
    pub fn load(store: Box<dyn PreferenceStore>) -> Self {
        let preferences = match store.load() {
            Ok(preferences) => preferences,
            Err(err) => {
                warn!(error = %err, "failed to load preferences, using defaults");
                Preferences::default()
            }
        };
        Self { preferences, store }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn theme(&self) -> Theme {
        self.preferences.theme
    }

    pub fn language(&self) -> &str {
        &self.preferences.language
    }

    pub fn is_logged_in(&self) -> bool {
        self.preferences.logged_in
    }

    pub fn set_theme(&mut self, theme: Theme) -> DataResult<()> {
        self.update(|preferences| preferences.theme = theme)
    }

    pub fn set_language(&mut self, language: impl Into<String>) -> DataResult<()> {
        let language = language.into();
        self.update(|preferences| preferences.language = language)
    }

    pub fn log_in(&mut self) -> DataResult<()> {
        self.update(|preferences| preferences.logged_in = true)
    }

    pub fn log_out(&mut self) -> DataResult<()> {
        self.update(|preferences| preferences.logged_in = false)
    }

    fn update<F>(&mut self, apply: F) -> DataResult<()>
    where
        F: FnOnce(&mut Preferences),
    {
        let mut next = self.preferences.clone();
        apply(&mut next);
        self.store.save(&next)?;
        self.preferences = next;
        Ok(())
    }
}
