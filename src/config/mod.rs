//! Configuration for storylogic
//!
//! Settings come from a TOML file, then environment overrides, then an
//! optional solver profile.
//!
//! # Configuration File Locations
//!
//! Configuration files are searched in order (first found wins):
//! 1. `./storylogic.toml` - Project-local configuration
//! 2. `~/.config/storylogic/config.toml` - User configuration (XDG)
//! 3. `~/.storylogic/config.toml` - User configuration (legacy)
//! 4. `/etc/storylogic/config.toml` - System-wide configuration
//!
//! # Environment Variables
//!
//! - `STORYLOGIC_PROFILE` - Solver profile (default, fast, thorough, or a custom name)
//! - `STORYLOGIC_LOG_LEVEL` - Logging verbosity (quiet, normal, verbose, debug)
//! - `STORYLOGIC_MAX_CONFLICTS` - Conflict budget per check (0 = unlimited)
//! - `STORYLOGIC_MAX_GROUND_CLAUSES` - Grounding budget per check (0 = unlimited)
//! - `STORYLOGIC_WITNESS_ELEMENTS` - Anonymous domain elements added to each check
//! - `STORYLOGIC_MAX_RETRIES` - Retry budget for correction loops
//!
//! # Example Configuration
//!
//! ```toml
//! [general]
//! log_level = "normal"
//!
//! [solver]
//! profile = "default"
//! max_conflicts = 100000
//! witness_elements = 1
//! minimize_cores = true
//!
//! [session]
//! max_retries = 10
//! balance_parens = true
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ============================================================================
// Configuration Schema
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StoryConfig {
    pub general: GeneralConfig,
    pub solver: SolverConfig,
    pub session: SessionConfig,
    /// Custom solver profiles
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub profiles: HashMap<String, ProfileConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: LogLevel,
}

/// Satisfiability engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    /// Profile the current values came from
    pub profile: SolverProfile,
    /// Conflicts allowed per check before answering `unknown` (0 = unlimited)
    pub max_conflicts: u64,
    /// Conflicts before the first restart
    pub restart_interval: u64,
    /// Growth factor between restarts
    pub restart_multiplier: f64,
    /// Clauses the grounder may emit per check (0 = unlimited)
    pub max_ground_clauses: usize,
    /// Anonymous elements standing in for unnamed integers
    pub witness_elements: usize,
    /// Shrink unsat cores by deletion before scoring
    pub minimize_cores: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            profile: SolverProfile::Default,
            max_conflicts: 100_000,
            restart_interval: 100,
            restart_multiplier: 1.5,
            max_ground_clauses: 2_000_000,
            witness_elements: 1,
            minimize_cores: true,
        }
    }
}

/// Turn processing settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Attempts allowed by correction loops
    pub max_retries: usize,
    /// Append missing closing parentheses before parsing
    pub balance_parens: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_retries: 10, balance_parens: true }
    }
}

/// A user-defined `[profiles.NAME]` table
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ProfileConfig {
    pub description: Option<String>,
    pub max_conflicts: Option<u64>,
    pub restart_interval: Option<u64>,
    pub restart_multiplier: Option<f64>,
    pub max_ground_clauses: Option<usize>,
    pub witness_elements: Option<usize>,
    pub minimize_cores: Option<bool>,
}

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiet" | "q" | "silent" => Some(LogLevel::Quiet),
            "normal" | "n" | "info" => Some(LogLevel::Normal),
            "verbose" | "v" => Some(LogLevel::Verbose),
            "debug" | "d" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    /// The `tracing` filter directive for this level
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "error",
            LogLevel::Normal => "info",
            LogLevel::Verbose => "debug",
            LogLevel::Debug => "trace",
        }
    }
}

/// Named bundles of solver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum SolverProfile {
    #[default]
    Default,
    /// Small budgets, no core minimisation
    Fast,
    /// Unlimited conflicts, extra witnesses
    Thorough,
    /// A `[profiles.NAME]` table
    Custom(String),
}

impl SolverProfile {
    pub fn as_str(&self) -> &str {
        match self {
            SolverProfile::Default => "default",
            SolverProfile::Fast => "fast",
            SolverProfile::Thorough => "thorough",
            SolverProfile::Custom(name) => name,
        }
    }

    /// Built-in profiles only
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "default" => Some(SolverProfile::Default),
            "fast" | "quick" => Some(SolverProfile::Fast),
            "thorough" | "complete" => Some(SolverProfile::Thorough),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SolverProfile::Default => "Balanced budgets with minimal unsat cores",
            SolverProfile::Fast => "Small conflict budget, raw unsat cores",
            SolverProfile::Thorough => "Unlimited conflicts and extra witness elements",
            SolverProfile::Custom(_) => "Custom profile",
        }
    }

    /// Solver settings this profile stands for
    fn settings(&self) -> SolverConfig {
        let base = SolverConfig { profile: self.clone(), ..SolverConfig::default() };
        match self {
            SolverProfile::Default | SolverProfile::Custom(_) => base,
            SolverProfile::Fast => SolverConfig {
                max_conflicts: 10_000,
                max_ground_clauses: 200_000,
                minimize_cores: false,
                ..base
            },
            SolverProfile::Thorough => SolverConfig {
                max_conflicts: 0,
                max_ground_clauses: 0,
                witness_elements: 2,
                ..base
            },
        }
    }
}

impl From<String> for SolverProfile {
    fn from(name: String) -> Self {
        SolverProfile::from_str(&name).unwrap_or(SolverProfile::Custom(name))
    }
}

impl From<SolverProfile> for String {
    fn from(profile: SolverProfile) -> Self {
        profile.as_str().to_string()
    }
}

// ============================================================================
// Loading
// ============================================================================

impl StoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the first config file found, then apply environment
    /// overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for path in Self::config_paths() {
            if path.exists() {
                config = Self::load_from_file(&path)?;
                break;
            }
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;
        Self::from_toml(&content, path)
    }

    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        Self::from_toml(content, Path::new("<string>"))
    }

    /// Parse a file's content. A `[solver] profile` other than `default`
    /// supplies the solver settings; keys written in `[solver]` still win.
    fn from_toml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let parse_error = |e: toml::de::Error| ConfigError::ParseError(origin.to_path_buf(), e.to_string());
        let mut config: StoryConfig = toml::from_str(content).map_err(parse_error)?;
        if config.solver.profile == SolverProfile::Default {
            return Ok(config);
        }

        let name = config.solver.profile.as_str().to_string();
        config.apply_profile(&name)?;
        let written: toml::Table = toml::from_str(content).map_err(parse_error)?;
        if let Some(keys) = written.get("solver").and_then(toml::Value::as_table) {
            let mut merged = match toml::Value::try_from(&config.solver) {
                Ok(toml::Value::Table(table)) => table,
                Ok(_) => toml::Table::new(),
                Err(e) => return Err(ConfigError::SerializeError(e.to_string())),
            };
            merged.extend(keys.iter().map(|(k, v)| (k.clone(), v.clone())));
            config.solver = toml::Value::Table(merged).try_into().map_err(parse_error)?;
        }
        Ok(config)
    }

    /// Candidate config files, most specific first
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./storylogic.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("storylogic").join("config.toml"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".storylogic").join("config.toml"));
        }

        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/storylogic/config.toml"));

        paths
    }

    /// Apply `STORYLOGIC_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    ///
    /// The profile is applied first so explicit values win over it.
    /// Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = var("STORYLOGIC_PROFILE") {
            self.apply_profile(&val)?;
        }

        if let Some(level) = var("STORYLOGIC_LOG_LEVEL").and_then(|v| LogLevel::from_str(&v)) {
            self.general.log_level = level;
        }

        if let Some(n) = var("STORYLOGIC_MAX_CONFLICTS").and_then(|v| v.parse().ok()) {
            self.solver.max_conflicts = n;
        }

        if let Some(n) = var("STORYLOGIC_MAX_GROUND_CLAUSES").and_then(|v| v.parse().ok()) {
            self.solver.max_ground_clauses = n;
        }

        if let Some(n) = var("STORYLOGIC_WITNESS_ELEMENTS").and_then(|v| v.parse().ok()) {
            self.solver.witness_elements = n;
        }

        if let Some(n) = var("STORYLOGIC_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.session.max_retries = n;
        }

        Ok(())
    }

    /// Replace the solver settings with a built-in or custom profile
    pub fn apply_profile(&mut self, name: &str) -> Result<(), ConfigError> {
        if let Some(profile) = SolverProfile::from_str(name) {
            self.solver = profile.settings();
            return Ok(());
        }

        let custom = self
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;

        let mut solver = SolverProfile::Custom(name.to_string()).settings();
        if let Some(v) = custom.max_conflicts {
            solver.max_conflicts = v;
        }
        if let Some(v) = custom.restart_interval {
            solver.restart_interval = v;
        }
        if let Some(v) = custom.restart_multiplier {
            solver.restart_multiplier = v;
        }
        if let Some(v) = custom.max_ground_clauses {
            solver.max_ground_clauses = v;
        }
        if let Some(v) = custom.witness_elements {
            solver.witness_elements = v;
        }
        if let Some(v) = custom.minimize_cores {
            solver.minimize_cores = v;
        }
        self.solver = solver;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))
    }

    /// Commented default configuration file
    pub fn default_config_content() -> &'static str {
        r#"# storylogic configuration file
# Place in ./storylogic.toml or ~/.config/storylogic/config.toml

[general]
# Log level: quiet, normal, verbose, debug
log_level = "normal"

[solver]
# Profile: default, fast, thorough, or a [profiles.NAME] table.
# A profile other than default sets the solver keys not written here.
profile = "default"
# Conflicts per check before the verdict is "unknown" (0 = unlimited)
max_conflicts = 100000
# Conflicts before the first restart, and the growth factor after each
restart_interval = 100
restart_multiplier = 1.5
# Clauses the grounder may emit per check (0 = unlimited)
max_ground_clauses = 2000000
# Anonymous elements standing in for unnamed integers
witness_elements = 1
# Shrink unsat cores before scoring
minimize_cores = true

[session]
# Attempts allowed when re-prompting for corrected formulas
max_retries = 10
# Append missing closing parentheses before parsing
balance_parens = true

# Custom profiles can be defined like this:
# [profiles.careful]
# description = "Three witnesses, no conflict limit"
# max_conflicts = 0
# witness_elements = 3
"#
    }

    /// All available profiles with their descriptions
    pub fn available_profiles(&self) -> Vec<(&str, &str)> {
        let mut profiles = vec![
            ("default", SolverProfile::Default.description()),
            ("fast", SolverProfile::Fast.description()),
            ("thorough", SolverProfile::Thorough.description()),
        ];

        for (name, config) in &self.profiles {
            let desc = config.description.as_deref().unwrap_or("Custom profile");
            profiles.push((name.as_str(), desc));
        }

        profiles
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// IO error reading/writing config file
    IoError(PathBuf, String),
    /// Parse error in config file
    ParseError(PathBuf, String),
    SerializeError(String),
    UnknownProfile(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, msg) => {
                write!(f, "IO error reading {}: {}", path.display(), msg)
            }
            ConfigError::ParseError(path, msg) => {
                write!(f, "Parse error in {}: {}", path.display(), msg)
            }
            ConfigError::SerializeError(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            ConfigError::UnknownProfile(name) => {
                write!(f, "Unknown profile: {}", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        CoreError::config(err.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = StoryConfig::new();
        assert_eq!(config.general.log_level, LogLevel::Normal);
        assert_eq!(config.solver.witness_elements, 1);
        assert!(config.solver.minimize_cores);
        assert_eq!(config.session.max_retries, 10);
        assert!(config.session.balance_parens);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [general]
            log_level = "verbose"

            [solver]
            max_conflicts = 500
            witness_elements = 3

            [session]
            balance_parens = false
        "#;

        let config = StoryConfig::load_from_str(toml).unwrap();
        assert_eq!(config.general.log_level, LogLevel::Verbose);
        assert_eq!(config.solver.max_conflicts, 500);
        assert_eq!(config.solver.witness_elements, 3);
        assert_eq!(config.solver.restart_interval, 100);
        assert!(!config.session.balance_parens);
        assert_eq!(config.session.max_retries, 10);
    }

    #[test]
    fn test_default_content_parses() {
        let config = StoryConfig::load_from_str(StoryConfig::default_config_content()).unwrap();
        assert_eq!(config, StoryConfig::default());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(LogLevel::from_str("quiet"), Some(LogLevel::Quiet));
        assert_eq!(LogLevel::from_str("VERBOSE"), Some(LogLevel::Verbose));
        assert_eq!(LogLevel::from_str("loud"), None);
        assert_eq!(LogLevel::Normal.as_filter(), "info");
        assert_eq!(LogLevel::Debug.as_filter(), "trace");
    }

    #[test]
    fn test_apply_profile() {
        let mut config = StoryConfig::new();

        config.apply_profile("fast").unwrap();
        assert_eq!(config.solver.profile, SolverProfile::Fast);
        assert_eq!(config.solver.max_conflicts, 10_000);
        assert!(!config.solver.minimize_cores);

        config.apply_profile("thorough").unwrap();
        assert_eq!(config.solver.max_conflicts, 0);
        assert_eq!(config.solver.witness_elements, 2);
        assert!(config.solver.minimize_cores);
    }

    #[test]
    fn test_custom_profile() {
        let toml = r#"
            [profiles.careful]
            description = "More witnesses"
            witness_elements = 4
            max_conflicts = 0
        "#;

        let mut config = StoryConfig::load_from_str(toml).unwrap();
        config.apply_profile("careful").unwrap();
        assert_eq!(config.solver.profile, SolverProfile::Custom("careful".into()));
        assert_eq!(config.solver.witness_elements, 4);
        assert_eq!(config.solver.max_conflicts, 0);
        assert_eq!(config.solver.restart_interval, 100);
        assert!(config.available_profiles().iter().any(|(n, d)| *n == "careful" && *d == "More witnesses"));
    }

    #[test]
    fn test_unknown_profile_error() {
        let mut config = StoryConfig::new();
        let result = config.apply_profile("nonexistent");
        assert!(matches!(result, Err(ConfigError::UnknownProfile(_))));
        let err: CoreError = result.unwrap_err().into();
        assert_eq!(err.code(), ErrorCode::ConfigError);
    }

    #[test]
    fn test_overrides() {
        let mut config = StoryConfig::new();
        config
            .apply_overrides(vars(&[
                ("STORYLOGIC_PROFILE", "fast"),
                ("STORYLOGIC_MAX_CONFLICTS", "42"),
                ("STORYLOGIC_LOG_LEVEL", "debug"),
                ("STORYLOGIC_MAX_RETRIES", "3"),
                ("STORYLOGIC_WITNESS_ELEMENTS", "not a number"),
            ]))
            .unwrap();
        assert_eq!(config.solver.profile, SolverProfile::Fast);
        assert_eq!(config.solver.max_conflicts, 42);
        assert_eq!(config.solver.witness_elements, 1);
        assert_eq!(config.general.log_level, LogLevel::Debug);
        assert_eq!(config.session.max_retries, 3);

        let err = config.apply_overrides(vars(&[("STORYLOGIC_PROFILE", "nope")]));
        assert!(err.is_err());
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut config = StoryConfig::new();
        config.apply_profile("thorough").unwrap();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[solver]"));
        assert!(toml.contains("[session]"));
        assert_eq!(StoryConfig::load_from_str(&toml).unwrap(), config);

        let toml = r#"
            [solver]
            profile = "careful"

            [profiles.careful]
            witness_elements = 4
        "#;
        let config = StoryConfig::load_from_str(toml).unwrap();
        assert_eq!(config.solver.profile, SolverProfile::Custom("careful".into()));
        assert_eq!(config.solver.witness_elements, 4);
    }

    #[test]
    fn test_profile_in_file_sets_budgets() {
        let toml = r#"
            [solver]
            profile = "fast"
        "#;
        let config = StoryConfig::load_from_str(toml).unwrap();
        assert_eq!(config.solver.profile, SolverProfile::Fast);
        assert_eq!(config.solver.max_conflicts, 10_000);
        assert!(!config.solver.minimize_cores);

        let toml = r#"
            [solver]
            profile = "fast"
            max_conflicts = 77
        "#;
        let config = StoryConfig::load_from_str(toml).unwrap();
        assert_eq!(config.solver.max_conflicts, 77);
        assert_eq!(config.solver.max_ground_clauses, 200_000);

        let missing = StoryConfig::load_from_str("[solver]\nprofile = \"nowhere\"\n");
        assert!(matches!(missing, Err(ConfigError::UnknownProfile(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storylogic.toml");
        let mut config = StoryConfig::new();
        config.session.max_retries = 2;
        config.save_to_file(&path).unwrap();
        assert_eq!(StoryConfig::load_from_file(&path).unwrap(), config);
        assert!(matches!(
            StoryConfig::load_from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::IoError(..))
        ));
    }

    #[test]
    fn test_config_paths() {
        let paths = StoryConfig::config_paths();
        assert!(paths[0].ends_with("storylogic.toml"));
    }
}
