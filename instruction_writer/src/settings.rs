use std::{collections::HashMap, env, path::PathBuf};

use crate::error::Error;

pub const PATH_PREFIX_ENV: &str = "MAKO_INSTR_WRITE_PATH_PREFIX";
pub const INSTANCE_ENV: &str = "MAKO_INSTANCE";
const INSTANCE_FALLBACK_ENVS: [&str; 2] = ["ZONENAME", "HOSTNAME"];

/// Names under which settings are looked up in a settings map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingName {
    InstrWritePathPrefix,
    Instance,
}

impl SettingName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingName::InstrWritePathPrefix => "instr_write_path_prefix",
            SettingName::Instance => "instance",
        }
    }
}

/// Configuration of the instruction writer.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterSettings {
    /// Spool root; each storage node gets a directory below it.
    pub instr_write_path_prefix: PathBuf,
    /// Embedded in every file name to tell apart writers running in different zones.
    pub instance: String,
}

impl WriterSettings {
    pub fn new(instr_write_path_prefix: impl Into<PathBuf>, instance: impl Into<String>) -> Self {
        Self {
            instr_write_path_prefix: instr_write_path_prefix.into(),
            instance: instance.into(),
        }
    }

    /// Loads settings from the environment, reading a `.env` file first if
    /// present. Explicit values override the environment.
    pub fn from_env(
        path_prefix: Option<PathBuf>,
        instance: Option<String>,
    ) -> Result<Self, Error> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded environment file");
        }

        let mut map = HashMap::new();
        if let Ok(prefix) = env::var(PATH_PREFIX_ENV) {
            map.insert(SettingName::InstrWritePathPrefix.as_str().to_string(), prefix);
        }
        if let Some(instance) = std::iter::once(INSTANCE_ENV)
            .chain(INSTANCE_FALLBACK_ENVS)
            .find_map(|name| env::var(name).ok().filter(|v| !v.is_empty()))
        {
            map.insert(SettingName::Instance.as_str().to_string(), instance);
        }
        if let Some(prefix) = path_prefix {
            map.insert(
                SettingName::InstrWritePathPrefix.as_str().to_string(),
                prefix.to_string_lossy().to_string(),
            );
        }
        if let Some(instance) = instance {
            map.insert(SettingName::Instance.as_str().to_string(), instance);
        }

        Self::try_from(map)
    }
}

impl TryFrom<HashMap<String, String>> for WriterSettings {
    type Error = Error;

    fn try_from(map: HashMap<String, String>) -> Result<Self, Error> {
        let instr_write_path_prefix = match map.get(SettingName::InstrWritePathPrefix.as_str()) {
            Some(prefix) => PathBuf::from(prefix),
            None => file_system::get_default_spool_root().ok_or_else(|| {
                Error::ConfigError(
                    "no spool root configured and no default data directory available".to_string(),
                )
            })?,
        };

        let instance = map
            .get(SettingName::Instance.as_str())
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or_else(|| {
                Error::ConfigError(format!(
                    "instance name missing, set {} or pass it explicitly",
                    INSTANCE_ENV
                ))
            })?;

        if instance.contains('/') {
            return Err(Error::ConfigError(format!(
                "instance name {:?} must not contain '/'",
                instance
            )));
        }

        Ok(Self {
            instr_write_path_prefix,
            instance,
        })
    }
}
