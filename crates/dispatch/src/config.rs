//! Plugin configuration.
//!
//! Loaded from `--config <path>` or `$XDG_CONFIG_HOME/bufsync/config.toml`. A missing
//! default file yields [`Config::default`]; an explicitly requested file must exist.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The file is not valid TOML or does not match the schema.
	#[error("invalid configuration{}: {error}", in_file(.path))]
	Parse {
		/// File the text came from, if any.
		path: Option<PathBuf>,
		/// The underlying parse error.
		error: toml::de::Error,
	},

	/// A value is syntactically fine but unusable.
	#[error("invalid value for {key}: {reason}")]
	Invalid {
		/// Offending key.
		key: &'static str,
		/// Why it was rejected.
		reason: String,
	},
}

fn in_file(path: &Option<PathBuf>) -> String {
	path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default()
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Register the debug listener that logs every event.
	pub debug: bool,
	/// Quiet period before a document is considered settled.
	pub debounce_ms: u64,
	/// Capacity of the queue between the relay reader and the dispatch thread.
	pub queue_capacity: usize,
	/// Relay executable, looked up on `PATH` unless absolute.
	pub relay_program: String,
	/// How long to wait for the relay to connect back, and for its shutdown answer.
	pub connect_timeout_ms: u64,
	pub syntax: SyntaxConfig,
}

/// Settings of the syntax listener.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntaxConfig {
	/// Buffer name suffixes the syntax listener is registered for.
	pub filetypes: Vec<String>,
	/// Where settled outlines are written. Defaults to the temp directory.
	pub outline_path: Option<PathBuf>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			debug: false,
			debounce_ms: 100,
			queue_capacity: 1024,
			relay_program: "bufsync-relay".to_string(),
			connect_timeout_ms: 5000,
			syntax: SyntaxConfig::default(),
		}
	}
}

impl Default for SyntaxConfig {
	fn default() -> Self {
		Self {
			filetypes: vec![".java".to_string()],
			outline_path: None,
		}
	}
}

impl Config {
	/// Default location of the configuration file.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join("bufsync").join("config.toml"))
	}

	/// Loads `path`, or the default file when `path` is `None`.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		match path {
			Some(path) => Self::load_file(path),
			None => match Self::default_path() {
				Some(path) if path.exists() => Self::load_file(&path),
				_ => Ok(Self::default()),
			},
		}
	}

	pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::parse(&text).map_err(|err| match err {
			ConfigError::Parse { error, .. } => ConfigError::Parse {
				path: Some(path.to_path_buf()),
				error,
			},
			other => other,
		})
	}

	pub fn parse(text: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text).map_err(|error| ConfigError::Parse { path: None, error })?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.queue_capacity == 0 {
			return Err(ConfigError::Invalid {
				key: "queue_capacity",
				reason: "must be at least 1".to_string(),
			});
		}
		if self.relay_program.trim().is_empty() {
			return Err(ConfigError::Invalid {
				key: "relay_program",
				reason: "must not be empty".to_string(),
			});
		}
		Ok(())
	}

	pub fn debounce(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}

	pub fn connect_timeout(&self) -> Duration {
		Duration::from_millis(self.connect_timeout_ms)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn empty_file_yields_defaults() {
		let config = Config::parse("").unwrap();
		assert_eq!(config, Config::default());
		assert_eq!(config.debounce(), Duration::from_millis(100));
		assert_eq!(config.syntax.filetypes, vec![".java".to_string()]);
	}

	#[test]
	fn partial_file_keeps_other_defaults() {
		let config = Config::parse(
			r#"
debug = true
debounce_ms = 250

[syntax]
filetypes = [".java", ".kt"]
outline_path = "/tmp/outline.txt"
"#,
		)
		.unwrap();
		assert!(config.debug);
		assert_eq!(config.debounce_ms, 250);
		assert_eq!(config.queue_capacity, 1024);
		assert_eq!(config.syntax.filetypes.len(), 2);
		assert_eq!(config.syntax.outline_path, Some(PathBuf::from("/tmp/outline.txt")));
	}

	#[test]
	fn unknown_keys_are_rejected() {
		assert!(matches!(Config::parse("debounce = 5"), Err(ConfigError::Parse { .. })));
		assert!(matches!(Config::parse("[syntax]\nlanguages = []"), Err(ConfigError::Parse { .. })));
	}

	#[test]
	fn zero_capacity_is_invalid() {
		assert!(matches!(
			Config::parse("queue_capacity = 0"),
			Err(ConfigError::Invalid { key: "queue_capacity", .. })
		));
	}

	#[test]
	fn explicit_file_is_loaded_and_must_exist() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, "relay_program = \"/opt/bufsync/relay\"\n").unwrap();
		assert_eq!(Config::load(Some(&path)).unwrap().relay_program, "/opt/bufsync/relay");

		let missing = dir.path().join("missing.toml");
		assert!(matches!(Config::load(Some(&missing)), Err(ConfigError::Io { .. })));
	}

	#[test]
	fn parse_errors_name_the_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, "debug = \"yes\"").unwrap();
		let err = Config::load(Some(&path)).unwrap_err();
		assert!(err.to_string().contains("config.toml"), "{err}");
	}
}
