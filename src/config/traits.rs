use crate::error::IdsightError;
use serde::{Deserialize, Serialize};

/// Trait for configuration sections
pub trait ConfigSection: Serialize + for<'de> Deserialize<'de> + Default + Clone {
    fn section_name() -> &'static str;
    fn validate(&self) -> Result<(), IdsightError>;
}

/// Validate a section, prefixing configuration errors with its name.
pub(crate) fn validate_section<S: ConfigSection>(section: &S) -> Result<(), IdsightError> {
    section.validate().map_err(|e| match e {
        IdsightError::Configuration(msg) => {
            IdsightError::Configuration(format!("[{}] {}", S::section_name(), msg))
        }
        other => other,
    })
}

pub(crate) fn check_fraction(section: &str, name: &str, value: f64) -> Result<(), IdsightError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(IdsightError::Configuration(format!(
            "{}.{} must be between 0 and 1, got {}",
            section, name, value
        )));
    }
    Ok(())
}
