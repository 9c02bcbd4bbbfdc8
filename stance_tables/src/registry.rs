use crate::config::StanceFileConfig;
use crate::session::SessionConfig;
use crate::stance::ConfiguredStance;
use crate::ConfigError;
use stance_core::registry::StanceRegistry;
use stance_core::{Stance, StanceError};
use std::collections::BTreeMap;
use std::path::Path;

/// Registry of all configured stances, loaded from TOML files
#[derive(Debug, Default)]
pub struct StanceTableRegistry {
    stances: BTreeMap<String, ConfiguredStance>,
    session: Option<SessionConfig>,
}

impl StanceTableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Load all stance files from a directory (recursively)
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        registry.load_dir(dir)?;
        tracing::info!(
            "Loaded {} configured stances from {}",
            registry.stances.len(),
            dir.display()
        );
        Ok(registry)
    }

    /// Load stance files from a directory recursively
    pub fn load_dir(&mut self, dir: &Path) -> Result<(), ConfigError> {
        if !dir.exists() {
            return Ok(());
        }

        let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::Io {
            error: e,
            path: Some(dir.to_path_buf()),
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| ConfigError::Io {
                error: e,
                path: Some(dir.to_path_buf()),
            })?;
            let path = entry.path();

            if path.is_dir() {
                self.load_dir(&path)?;
            } else if path.extension().is_some_and(|ext| ext == "toml") {
                self.load_file(&path)?;
            }
        }

        Ok(())
    }

    /// Load a single stance file
    pub fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            error: e,
            path: Some(path.to_path_buf()),
        })?;
        self.parse_str(&content, path)
    }

    /// Parse file content; `path` is only used for error reporting
    pub fn parse_str(&mut self, content: &str, path: &Path) -> Result<(), ConfigError> {
        let config: StanceFileConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            error: e,
            path: path.to_path_buf(),
        })?;

        if let Some(session) = config.session {
            if self.session.is_some() {
                return Err(ConfigError::Validation {
                    message: "Session settings defined more than once".to_string(),
                    path: path.to_path_buf(),
                });
            }
            self.session = Some(session);
        }

        if let Some(stance) = config.stance {
            let stance = ConfiguredStance::from_config(stance).map_err(|e| ConfigError::Validation {
                message: e.to_string(),
                path: path.to_path_buf(),
            })?;
            let id = stance.definition().identifier.clone();
            if self.stances.contains_key(&id) {
                return Err(ConfigError::Validation {
                    message: format!("Duplicate stance id '{}'", id),
                    path: path.to_path_buf(),
                });
            }
            tracing::debug!("Loaded stance {} from {}", id, path.display());
            self.stances.insert(id, stance);
        }
        Ok(())
    }

    /// Get a stance by ID
    pub fn get(&self, id: &str) -> Option<&ConfiguredStance> {
        self.stances.get(id)
    }

    /// Check if a stance exists
    pub fn contains(&self, id: &str) -> bool {
        self.stances.contains_key(id)
    }

    /// List all stance IDs
    pub fn stance_ids(&self) -> impl Iterator<Item = &str> {
        self.stances.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.stances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stances.is_empty()
    }

    /// Session settings, if any file defined them
    pub fn session(&self) -> Option<&SessionConfig> {
        self.session.as_ref()
    }

    /// Register every configured stance with a stance registry
    ///
    /// Fails on the first identifier the registry already knows.
    pub fn install(&self, registry: &mut StanceRegistry) -> Result<usize, StanceError> {
        for stance in self.stances.values() {
            registry.register(stance.clone())?;
        }
        Ok(self.stances.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use stance_core::{variants, StanceContext};
    use tempfile::TempDir;

    fn create_test_table(dir: &Path, name: &str, content: &str) {
        let path = dir.join(format!("{}.toml", name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    const SENTRY: &str = r#"
[stance]
id = "evo:sentry"
level = "Sentry"
fallback = "evo:rookie"

[stance.stability]
start = 60
maximum = 80
entry_cost = 15
per_turn_drain = 10
"#;

    #[test]
    fn test_load_simple_stance() {
        let dir = TempDir::new().unwrap();
        create_test_table(dir.path(), "sentry", SENTRY);

        let registry = StanceTableRegistry::load(dir.path()).unwrap();
        assert!(registry.contains("evo:sentry"));
        assert_eq!(registry.len(), 1);
        assert!(registry.session().is_none());
    }

    #[test]
    fn test_load_nested_dirs_and_session() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("forms");
        std::fs::create_dir(&nested).unwrap();
        create_test_table(&nested, "sentry", SENTRY);
        create_test_table(
            dir.path(),
            "session",
            r#"
[session]
seed = 7
default_fallback = "evo:sentry"
"#,
        );
        // Non-toml files are skipped
        create_test_table(dir.path(), "notes", "ignored");
        std::fs::rename(dir.path().join("notes.toml"), dir.path().join("notes.txt")).unwrap();

        let registry = StanceTableRegistry::load(dir.path()).unwrap();
        assert_eq!(registry.stance_ids().collect::<Vec<_>>(), vec!["evo:sentry"]);
        let session = registry.session().unwrap();
        assert_eq!(session.seed, Some(7));
        assert_eq!(session.default_fallback.as_deref(), Some("evo:sentry"));
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = StanceTableRegistry::load(&dir.path().join("absent")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dir = TempDir::new().unwrap();
        create_test_table(dir.path(), "a", SENTRY);
        create_test_table(dir.path(), "b", SENTRY);
        let err = StanceTableRegistry::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert!(err.to_string().contains("Duplicate stance id"));
    }

    #[test]
    fn test_parse_and_validation_errors() {
        let mut registry = StanceTableRegistry::new();
        let err = registry
            .parse_str("[stance]\nid = ", Path::new("broken.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = registry
            .parse_str(
                r#"
[stance]
id = "evo:bad"
level = "Bad"

[stance.stability]
start = 90
maximum = 50
"#,
                Path::new("bad.toml"),
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_install_and_enter() {
        let mut tables = StanceTableRegistry::new();
        tables.parse_str(SENTRY, Path::new("sentry.toml")).unwrap();

        let mut registry = StanceRegistry::new();
        variants::register_all(&mut registry).unwrap();
        assert_eq!(tables.install(&mut registry).unwrap(), 1);

        let mut manager = stance_core::StanceManager::new(registry);
        let mut ctx = StanceContext::new(70, 70);
        manager.enter("evo:sentry", &mut ctx, "manual", true).unwrap();
        assert_eq!(manager.current_record().unwrap().current, 45);

        // 45 -> 35 -> 25 -> 15 -> 5 -> 0, then the sentry gives way
        for _ in 0..5 {
            manager.tick_turn(&mut ctx, "turn_start").unwrap();
        }
        assert_eq!(manager.current_identifier(), Some(variants::ROOKIE));

        // Installing again collides
        let mut registry = StanceRegistry::new();
        tables.install(&mut registry).unwrap();
        assert!(tables.install(&mut registry).is_err());
    }
}
