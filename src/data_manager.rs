use crate::models::{NavigationRecord, Preferences};
use chrono::DateTime;
use serde::Serialize;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("DateTime parse error: {0}")]
    DateTime(String),
}

impl From<chrono::ParseError> for DataError {
    fn from(value: chrono::ParseError) -> Self {
        Self::DateTime(value.to_string())
    }
}

pub type DataResult<T> = Result<T, DataError>;

/// JSON files backing preferences and the journey history.
#[derive(Debug, Clone)]
pub struct DataManager {
    base_dir: PathBuf,
    preferences_path: PathBuf,
    journeys_path: PathBuf,
}

impl DataManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> DataResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        let preferences_path = base_dir.join("preferences.json");
        let journeys_path = base_dir.join("journeys.json");

        let manager = Self {
            base_dir,
            preferences_path,
            journeys_path,
        };

        if !manager.journeys_path.exists() {
            manager.write_json(&manager.journeys_path, &Vec::<NavigationRecord>::new())?;
        }

        Ok(manager)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn preferences_path(&self) -> &Path {
        &self.preferences_path
    }

    pub fn journeys_path(&self) -> &Path {
        &self.journeys_path
    }

    /// Saved preferences, or the defaults when nothing was stored yet.
    pub fn load_preferences(&self) -> DataResult<Preferences> {
        if !self.preferences_path.exists() {
            return Ok(Preferences::default());
        }
        let contents = fs::read_to_string(&self.preferences_path)?;
        if contents.trim().is_empty() {
            return Ok(Preferences::default());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save_preferences(&self, preferences: &Preferences) -> DataResult<()> {
        self.write_json(&self.preferences_path, preferences)
    }

    pub fn load_journeys(&self) -> DataResult<Vec<NavigationRecord>> {
        if !self.journeys_path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.journeys_path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save_journey(&self, record: NavigationRecord) -> DataResult<()> {
        let mut journeys = self.load_journeys()?;
        if let Some(existing) = journeys.iter_mut().find(|item| item.id == record.id) {
            *existing = record;
        } else {
            journeys.push(record);
        }
        self.save_journeys(&journeys)
    }

    pub fn save_journeys(&self, journeys: &[NavigationRecord]) -> DataResult<()> {
        self.write_json(&self.journeys_path, journeys)
    }

    pub fn load_journeys_in_range(
        &self,
        from: &str,
        to: &str,
    ) -> DataResult<Vec<NavigationRecord>> {
        let from_dt = Self::parse_datetime(from)?;
        let to_dt = Self::parse_datetime(to)?;
        let journeys = self.load_journeys()?;
        journeys
            .into_iter()
            .try_fold(Vec::new(), |mut acc, journey| {
                let started_at = Self::parse_datetime(&journey.started_at)?;
                if started_at >= from_dt && started_at <= to_dt {
                    acc.push(journey);
                }
                Ok(acc)
            })
    }

    fn parse_datetime(value: &str) -> DataResult<DateTime<chrono::FixedOffset>> {
        Ok(DateTime::parse_from_rfc3339(value)?)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> DataResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("tmp");
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        if let Err(err) = fs::rename(&temp_path, path) {
            if !path.exists() {
                return Err(DataError::from(err));
            }
            let _ = fs::remove_file(path);
            fs::rename(&temp_path, path)?;
        }
        debug!(path = %path.display(), "data file written");
        Ok(())
    }
}
