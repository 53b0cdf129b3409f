use std::path::{Path, PathBuf};
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

/// File names probed by [`discover_config_path`], in priority order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["hotpatch.toml", ".hotpatch.toml"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Toml(err.message().to_owned())
    }
}

/// Top-level configuration for a rewrite run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HotpatchConfig {
    pub rewrite: RewriteConfig,
    pub logging: LoggingConfig,
}

/// Which static fields count as private, and so are never qualified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldVisibility {
    /// Only fields carrying an explicit `private` modifier are private.
    #[default]
    ExplicitPrivateOnly,
    /// Fields without any access modifier are private as well.
    ImplicitPrivate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriteConfig {
    /// Attach a `/*Pass:Rule*/` comment to every rewritten node.
    pub write_rewrite_reason_as_comment: bool,

    /// Run the return-type pass, which casts returned values of methods whose return type is
    /// the enclosing type.
    pub cast_same_typed_returns: bool,

    pub field_visibility: FieldVisibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Either a simple level (`info`, `debug`, ...) or an `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".to_owned()
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            "off" | "none" => "off".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        })
    }

    /// Effective filter: the configured level, with `RUST_LOG` directives appended when set.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let config_directives = Self::normalize_level_directives(&self.level);

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

impl HotpatchConfig {
    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load the config discovered in `dir`, or the defaults when none exists.
    pub fn load_for_dir(dir: &Path) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match discover_config_path(dir) {
            Some(path) => {
                let config = Self::load_from_path(&path)?;
                tracing::debug!(target: "hotpatch.config", path = %path.display(), "loaded config");
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }
}

/// Find a config file directly inside `dir`.
///
/// Probes `hotpatch.toml`, then `.hotpatch.toml`.
pub fn discover_config_path(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

static TRACING_INIT: Once = Once::new();

/// Install the global tracing subscriber. Later calls are no-ops.
///
/// Logs always go to stderr so stdout stays free for rewritten source.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();

        let layer: Box<dyn Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            // Someone else (a test harness, an embedding host) already owns the global
            // subscriber.
            return;
        }
        tracing::debug!(target: "hotpatch.config", level = %config.level, "tracing initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = HotpatchConfig::load_from_str("").unwrap();
        assert_eq!(config, HotpatchConfig::default());
        assert!(!config.rewrite.write_rewrite_reason_as_comment);
        assert!(!config.rewrite.cast_same_typed_returns);
        assert_eq!(
            config.rewrite.field_visibility,
            FieldVisibility::ExplicitPrivateOnly
        );
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn parses_rewrite_section() {
        let config = HotpatchConfig::load_from_str(
            r#"
[rewrite]
write_rewrite_reason_as_comment = true
cast_same_typed_returns = true
field_visibility = "implicit-private"

[logging]
level = "debug"
json = true
"#,
        )
        .unwrap();

        assert!(config.rewrite.write_rewrite_reason_as_comment);
        assert!(config.rewrite.cast_same_typed_returns);
        assert_eq!(config.rewrite.field_visibility, FieldVisibility::ImplicitPrivate);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = HotpatchConfig::load_from_str("[rewrite]\nannotate = true\n").unwrap_err();
        match err {
            ConfigError::Toml(message) => assert!(message.contains("annotate"), "{message}"),
            other => panic!("expected toml error, got {other:?}"),
        }

        assert!(HotpatchConfig::load_from_str("[watch]\nenabled = true\n").is_err());
    }

    #[test]
    fn unknown_visibility_policy_is_rejected() {
        assert!(
            HotpatchConfig::load_from_str("[rewrite]\nfield_visibility = \"public\"\n").is_err()
        );
    }

    #[test]
    fn level_normalization() {
        assert_eq!(LoggingConfig::normalize_level_directives("  "), "warn");
        assert_eq!(LoggingConfig::normalize_level_directives("WARNING"), "warn");
        assert_eq!(LoggingConfig::normalize_level_directives("Debug"), "debug");
        assert_eq!(
            LoggingConfig::normalize_level_directives("hotpatch_rewrite=trace"),
            "hotpatch_rewrite=trace"
        );
    }

    #[test]
    fn discovers_config_files_in_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(discover_config_path(dir.path()), None);

        std::fs::write(dir.path().join(".hotpatch.toml"), "").unwrap();
        let found = discover_config_path(dir.path()).unwrap();
        assert!(found.ends_with(".hotpatch.toml"));

        std::fs::write(dir.path().join("hotpatch.toml"), "").unwrap();
        let found = discover_config_path(dir.path()).unwrap();
        assert!(found.ends_with("hotpatch.toml"));
        assert!(!found.ends_with(".hotpatch.toml"));
    }

    #[test]
    fn load_for_dir_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, path) = HotpatchConfig::load_for_dir(dir.path()).unwrap();
        assert_eq!(config, HotpatchConfig::default());
        assert!(path.is_none());

        std::fs::write(
            dir.path().join("hotpatch.toml"),
            "[rewrite]\ncast_same_typed_returns = true\n",
        )
        .unwrap();
        let (config, path) = HotpatchConfig::load_for_dir(dir.path()).unwrap();
        assert!(config.rewrite.cast_same_typed_returns);
        assert!(path.is_some());
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = HotpatchConfig::load_from_path(&missing).unwrap_err();
        match err {
            ConfigError::Io { path, .. } => assert!(path.ends_with("nope.toml")),
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
