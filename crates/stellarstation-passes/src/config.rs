use std::path::Path;

use serde::Deserialize;

/// A ground station the account has access to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroundStation {
    pub id: i64,
    pub name: Option<String>,
}

/// A satellite whose passes are listed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Satellite {
    pub id: i64,
    pub name: Option<String>,
}

impl Satellite {
    /// Satellite ids are integers in the config and strings on the wire.
    pub fn wire_id(&self) -> String {
        self.id.to_string()
    }
}

impl std::fmt::Display for Satellite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", self.id, name),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Client configuration loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_address: String,
    pub api_key_path: String,
    pub ground_stations: Vec<GroundStation>,
    pub satellites: Vec<Satellite>,
}

/// On-disk shape. Every field is optional here so that a missing or `null`
/// field is reported by name instead of as a generic parse error.
#[derive(Deserialize)]
struct RawConfig {
    api_address: Option<String>,
    api_key_path: Option<String>,
    ground_stations: Option<Vec<GroundStation>>,
    satellites: Option<Vec<Satellite>>,
}

impl Config {
    /// Load and validate the config at `path`.
    ///
    /// The file is read in full before parsing; see [`Config::from_json`] for
    /// what counts as valid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e))?;
        Self::from_json(&raw)
    }

    /// Parse a config from JSON text.
    ///
    /// The four top-level fields must be present and non-null. Entries in
    /// `ground_stations` and `satellites` need only an `id`; unknown keys are
    /// ignored.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json).map_err(ConfigError::Parse)?;

        Ok(Self {
            api_address: raw
                .api_address
                .ok_or(ConfigError::MissingField("api_address"))?,
            api_key_path: raw
                .api_key_path
                .ok_or(ConfigError::MissingField("api_key_path"))?,
            ground_stations: raw
                .ground_stations
                .ok_or(ConfigError::MissingField("ground_stations"))?,
            satellites: raw
                .satellites
                .ok_or(ConfigError::MissingField("satellites"))?,
        })
    }

    pub fn satellite(&self, id: i64) -> Option<&Satellite> {
        self.satellites.iter().find(|s| s.id == id)
    }

    /// Configured satellites restricted to `ids`, in config order. An empty
    /// `ids` selects every satellite.
    pub fn select_satellites(&self, ids: &[i64]) -> Result<Vec<Satellite>, ConfigError> {
        if let Some(unknown) = ids.iter().find(|id| self.satellite(**id).is_none()) {
            return Err(ConfigError::UnknownSatellite(*unknown));
        }
        Ok(self
            .satellites
            .iter()
            .filter(|s| ids.is_empty() || ids.contains(&s.id))
            .cloned()
            .collect())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read(String, std::io::Error),
    Parse(serde_json::Error),
    MissingField(&'static str),
    UnknownSatellite(i64),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read(path, e) => {
                write!(f, "failed to read config file {}: {}", path, e)
            }
            ConfigError::Parse(e) => write!(f, "failed to parse config: {}", e),
            ConfigError::MissingField(field) => {
                write!(f, "config is missing required field: {}", field)
            }
            ConfigError::UnknownSatellite(id) => {
                write!(f, "satellite {} is not in the config", id)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read(_, e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::MissingField(_) | ConfigError::UnknownSatellite(_) => None,
        }
    }
}
