use adjoin::{Direction, StreamOrder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Named set of defaults for `adjoin` invocations.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub name: String,
    pub id_column: Option<String>,
    pub next_down_column: Option<String>,
    pub order_column: Option<String>,
    pub direction: Option<Direction>,
    pub order: Option<StreamOrder>,
    pub cutoff: Option<usize>,
    pub threads: Option<usize>,
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
    profiles: BTreeMap<String, Profile>,
}

impl CliConfig {
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        let profiles = parse_profiles(&data)?;
        Ok(Self {
            path,
            data,
            profiles,
        })
    }

    pub fn default_profile_name(&self) -> Option<&str> {
        self.data
            .default_profile
            .as_deref()
            .filter(|name| self.profiles.contains_key(*name))
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    /// Profile selected by `--profile`, falling back to the configured default.
    pub fn resolve(&self, requested: Option<&str>) -> Result<Option<&Profile>, ConfigError> {
        match requested {
            Some(name) => self
                .profile(name)
                .map(Some)
                .ok_or_else(|| ConfigError::ProfileNotFound {
                    name: name.to_string(),
                }),
            None => Ok(self.default_profile_name().and_then(|name| self.profile(name))),
        }
    }

    pub fn set_default_profile(&mut self, name: Option<&str>) -> Result<(), ConfigError> {
        if let Some(name) = name {
            if !self.profiles.contains_key(name) {
                return Err(ConfigError::ProfileNotFound {
                    name: name.to_string(),
                });
            }
            self.data.default_profile = Some(name.to_string());
        } else {
            self.data.default_profile = None;
        }
        Ok(())
    }

    pub fn upsert_profile(&mut self, name: &str, update: ProfileUpdate) -> Result<(), ConfigError> {
        let entry = self.data.profiles.entry(name.to_string()).or_default();
        if let Some(column) = update.id_column {
            entry.id_column = Some(column);
        }
        if let Some(column) = update.next_down_column {
            entry.next_down_column = Some(column);
        }
        if let Some(column) = update.order_column {
            entry.order_column = Some(column);
        }
        if let Some(direction) = update.direction {
            entry.direction = Some(direction.to_string());
        }
        if let Some(order) = update.order {
            entry.order = Some(order);
        }
        if let Some(cutoff) = update.cutoff {
            entry.cutoff = Some(cutoff);
        }
        if let Some(threads) = update.threads {
            entry.threads = Some(threads);
        }
        if let Some(out_dir) = update.out_dir {
            entry.out_dir = Some(out_dir);
        }
        self.profiles = parse_profiles(&self.data)?;
        Ok(())
    }

    pub fn delete_profile(&mut self, name: &str) -> Result<(), ConfigError> {
        if self.data.profiles.remove(name).is_none() {
            return Err(ConfigError::ProfileNotFound {
                name: name.to_string(),
            });
        }
        if self.data.default_profile.as_deref() == Some(name) {
            self.data.default_profile = None;
        }
        self.profiles = parse_profiles(&self.data)?;
        Ok(())
    }

    pub fn persist(&self) -> Result<PathBuf, ConfigError> {
        let target = match &self.path {
            Some(path) => path.clone(),
            None => default_config_path().ok_or(ConfigError::NoConfigPath)?,
        };
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized = toml::to_string_pretty(&self.data)
            .map_err(|source| ConfigError::Serialize { source })?;
        fs::write(&target, serialized).map_err(|source| ConfigError::Write {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_profiles(data: &RawConfig) -> Result<BTreeMap<String, Profile>, ConfigError> {
    let mut profiles = BTreeMap::new();
    for (name, raw) in &data.profiles {
        profiles.insert(name.clone(), convert_profile(name, raw)?);
    }
    if let Some(default_name) = data.default_profile.as_ref() {
        if !profiles.contains_key(default_name) {
            return Err(ConfigError::ProfileNotFound {
                name: default_name.clone(),
            });
        }
    }
    Ok(profiles)
}

fn convert_profile(name: &str, raw: &RawProfile) -> Result<Profile, ConfigError> {
    let direction = match raw.direction.as_deref() {
        Some(value) => Some(value.parse::<Direction>().map_err(|_| {
            ConfigError::InvalidDirection {
                profile: name.to_string(),
                value: value.to_string(),
            }
        })?),
        None => None,
    };
    Ok(Profile {
        name: name.to_string(),
        id_column: raw.id_column.clone(),
        next_down_column: raw.next_down_column.clone(),
        order_column: raw.order_column.clone(),
        direction,
        order: raw.order,
        cutoff: raw.cutoff,
        threads: raw.threads,
        out_dir: raw.out_dir.clone(),
    })
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawConfig {
    #[serde(default)]
    default_profile: Option<String>,
    #[serde(default)]
    profiles: BTreeMap<String, RawProfile>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawProfile {
    id_column: Option<String>,
    next_down_column: Option<String>,
    order_column: Option<String>,
    direction: Option<String>,
    order: Option<StreamOrder>,
    cutoff: Option<usize>,
    threads: Option<usize>,
    out_dir: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub id_column: Option<String>,
    pub next_down_column: Option<String>,
    pub order_column: Option<String>,
    pub direction: Option<Direction>,
    pub order: Option<StreamOrder>,
    pub cutoff: Option<usize>,
    pub threads: Option<usize>,
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read CLI config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse CLI config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize CLI config: {source}")]
    Serialize { source: toml::ser::Error },
    #[error("failed to write CLI config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },
    #[error("profile '{profile}' direction value '{value}' is invalid")]
    InvalidDirection { profile: String, value: String },
    #[error("no config directory found; pass --config or set ADJOIN_CONFIG")]
    NoConfigPath,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("adjoin").join("cli.toml"))
}
