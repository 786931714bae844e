use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::event::NewConflictEvent;
use crate::ConfigError;

/// On-disk list of normalized events loaded at startup or by the CLI.
///
/// YAML or JSON; JSON parses as YAML.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub events: Vec<NewConflictEvent>,
}

/// Load and validate a seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_seed_file(path: &Path) -> Result<SeedFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SeedFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_seed(&content)
}

/// Parse and validate seed content already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the content cannot be parsed or fails validation.
pub fn parse_seed(content: &str) -> Result<SeedFile, ConfigError> {
    let seed: SeedFile = serde_yaml::from_str(content)?;
    validate_seed(&seed)?;
    Ok(seed)
}

fn validate_seed(seed: &SeedFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for (i, event) in seed.events.iter().enumerate() {
        event
            .validate()
            .map_err(|e| ConfigError::Validation(format!("event #{i}: {e}")))?;

        if let Some(id) = &event.id {
            if !seen_ids.insert(id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "event #{i}: duplicate id '{id}'"
                )));
            }
        }
    }

    Ok(())
}
