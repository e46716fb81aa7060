use super::{
    data::DataConfig, explanation::ExplanationConfig, selection::SelectionConfig,
    training::TrainingConfig, traits::validate_section,
};
use crate::error::IdsightError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Environment variables override file values, e.g.
/// `IDSIGHT__SELECTION__POPULATION_SIZE=40`.
pub const ENV_PREFIX: &str = "IDSIGHT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub selection: SelectionConfig,
    pub training: TrainingConfig,
    pub explanation: ExplanationConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), IdsightError> {
        validate_section(&self.data)?;
        validate_section(&self.selection)?;
        validate_section(&self.training)?;
        validate_section(&self.explanation)?;
        Ok(())
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), IdsightError> {
        let builder = config::Config::builder().add_source(
            config::File::from(path.as_ref())
                .format(config::FileFormat::Toml)
                .required(true),
        );
        self.load_layers(builder)
    }

    pub fn load_from_str(&self, toml_source: &str) -> Result<(), IdsightError> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml_source, config::FileFormat::Toml));
        self.load_layers(builder)
    }

    fn load_layers(
        &self,
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<(), IdsightError> {
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| IdsightError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| IdsightError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        log::info!(
            "Configuration loaded: population {}, generations {}, {} final trees",
            config.selection.population_size,
            config.selection.generations,
            config.training.forest.n_trees
        );

        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), IdsightError> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| IdsightError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| IdsightError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Apply `f` to a copy and commit it only if the result validates.
    pub fn update<F>(&self, f: F) -> Result<(), IdsightError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }
}
