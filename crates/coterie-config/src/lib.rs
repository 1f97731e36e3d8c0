use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found. Create one with 'coterie profile add' first.")]
    NotFound,
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Could not determine home directory")]
    NoHomeDir,
    #[error("No profiles configured")]
    NoProfiles,
    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),
}

/// CLI configuration stored in ~/.coterie/config.json
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
    #[serde(default)]
    pub current_profile: Option<String>, // Name of current profile
}

/// A named identity the CLI acts as.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProfileConfig {
    pub name: String,
    pub user_id: String, // UUID of the requester
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub read_policy: Option<String>, // "open" or "private-members-only"
}

impl CliConfig {
    /// Load config from default path (~/.coterie/config.json)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path()?)
    }

    /// Load config from custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound
            } else {
                ConfigError::Read(e)
            }
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Like [`Self::load_from`], but a missing file yields an empty config.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load_from(path) {
            Err(ConfigError::NotFound) => Ok(Self::default()),
            other => other,
        }
    }

    /// Save config to default path
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path()?)
    }

    /// Save config to custom path
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self)?)?;
        Ok(())
    }

    /// Get default config path (~/.coterie/config.json)
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(dirs::home_dir()
            .ok_or(ConfigError::NoHomeDir)?
            .join(".coterie")
            .join("config.json"))
    }

    /// Get the current active profile
    pub fn get_current_profile(&self) -> Result<&ProfileConfig, ConfigError> {
        let profile_name = self
            .current_profile
            .as_ref()
            .or_else(|| self.profiles.first().map(|p| &p.name))
            .ok_or(ConfigError::NoProfiles)?;

        self.get_profile(profile_name)
    }

    /// Get a profile by name
    pub fn get_profile(&self, name: &str) -> Result<&ProfileConfig, ConfigError> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))
    }

    /// Insert or replace a profile by name. The first profile added becomes current.
    pub fn upsert_profile(&mut self, profile: ProfileConfig) {
        if self.current_profile.is_none() {
            self.current_profile = Some(profile.name.clone());
        }
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
    }

    /// Make `name` the current profile.
    pub fn use_profile(&mut self, name: &str) -> Result<(), ConfigError> {
        self.get_profile(name)?;
        self.current_profile = Some(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn profile(name: &str, user_id: &str) -> ProfileConfig {
        ProfileConfig {
            name: name.to_string(),
            user_id: user_id.to_string(),
            database_url: None,
            read_policy: None,
        }
    }

    #[test]
    fn test_get_current_profile() {
        let config = CliConfig {
            profiles: vec![profile("alice", "u1"), profile("bob", "u2")],
            current_profile: Some("bob".to_string()),
        };

        let current = config.get_current_profile().unwrap();
        assert_eq!(current.name, "bob");
        assert_eq!(current.user_id, "u2");
    }

    #[test]
    fn test_get_current_profile_falls_back_to_first() {
        let config = CliConfig {
            profiles: vec![profile("alice", "u1"), profile("bob", "u2")],
            current_profile: None,
        };

        assert_eq!(config.get_current_profile().unwrap().name, "alice");
    }

    #[test]
    fn test_get_current_profile_errors() {
        let empty = CliConfig::default();
        assert!(matches!(
            empty.get_current_profile(),
            Err(ConfigError::NoProfiles)
        ));

        let dangling = CliConfig {
            profiles: vec![profile("alice", "u1")],
            current_profile: Some("carol".to_string()),
        };
        assert!(matches!(
            dangling.get_current_profile(),
            Err(ConfigError::ProfileNotFound(name)) if name == "carol"
        ));
    }

    #[test]
    fn test_upsert_and_use_profile() {
        let mut config = CliConfig::default();
        config.upsert_profile(profile("alice", "u1"));
        config.upsert_profile(profile("bob", "u2"));
        assert_eq!(config.current_profile.as_deref(), Some("alice"));

        config.upsert_profile(ProfileConfig {
            database_url: Some("sqlite://team.db".to_string()),
            ..profile("alice", "u3")
        });
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.get_profile("alice").unwrap().user_id, "u3");

        config.use_profile("bob").unwrap();
        assert_eq!(config.get_current_profile().unwrap().name, "bob");
        assert!(config.use_profile("carol").is_err());
        assert_eq!(config.current_profile.as_deref(), Some("bob"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = CliConfig {
            profiles: vec![ProfileConfig {
                read_policy: Some("private-members-only".to_string()),
                ..profile("alice", "u1")
            }],
            current_profile: Some("alice".to_string()),
        };
        config.save_to(&path).unwrap();

        let loaded = CliConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");

        assert!(matches!(
            CliConfig::load_from(&path),
            Err(ConfigError::NotFound)
        ));
        assert_eq!(
            CliConfig::load_or_default(&path).unwrap(),
            CliConfig::default()
        );
    }

    #[test]
    fn test_load_optional_fields_default() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"profiles":[{{"name":"alice","user_id":"u1"}}]}}"#
        )
        .unwrap();

        let config = CliConfig::load_from(file.path()).unwrap();
        assert_eq!(config.current_profile, None);
        assert_eq!(config.profiles[0].database_url, None);
        assert_eq!(config.profiles[0].read_policy, None);
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(matches!(
            CliConfig::load_from(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
