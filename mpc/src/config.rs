use std::{
    fs::File,
    io::{self, BufReader},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::protocol::DEFAULT_SECURITY_PARAMETER;

/// Default number of gates evaluated in a single round.
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Configuration of a single computation run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    /// Maximum number of gates evaluated in a single round.
    pub batch_size: usize,
    /// Statistical security parameter of masking protocols, in bits.
    pub security_parameter: usize,
    /// Prefix of preprocessing storage keys.
    pub storage_prefix: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            security_parameter: DEFAULT_SECURITY_PARAMETER,
            storage_prefix: String::new(),
        }
    }
}

impl RunConfig {
    /// Load configuration from JSON file.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: RunConfig = serde_json::from_str(r#"{"batch_size": 16}"#).unwrap();
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.security_parameter, DEFAULT_SECURITY_PARAMETER);
        assert_eq!(config.storage_prefix, "");
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("mpc-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"security_parameter": 40, "storage_prefix": "run1_"}"#).unwrap();
        let config = RunConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.security_parameter, 40);
        assert_eq!(config.storage_prefix, "run1_");
    }
}
