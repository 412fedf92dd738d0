//! Configuration for log conversion.

use std::fs;

use anyhow::Context;
use serde::Deserialize;

use crate::convert::grammar::GrammarMode;
use crate::convert::{DEFAULT_EXTENSION, DEFAULT_OUTPUT_DIR};

/// Config from the user config file.
#[derive(Debug, Default, Deserialize)]
pub struct LogConvertConfig {
    #[serde(default)]
    pub auto: bool,
    #[serde(default)]
    pub dryrun: bool,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub verbose: bool,
}

/// Wrapper needed for parsing the config section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    logconvert: LogConvertConfig,
}

/// Command line values, applied on top of the user config.
#[derive(Debug, Default)]
pub struct ConvertArgs {
    pub auto: bool,
    pub dryrun: bool,
    pub extension: Option<String>,
    pub force: bool,
    pub mode: Option<GrammarMode>,
    pub output: Option<String>,
    pub verbose: bool,
}

/// Final config created from CLI arguments and user config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    /// Skip the confirmation prompt.
    pub auto: bool,
    pub dryrun: bool,
    /// Log file extension without the leading dot.
    pub extension: String,
    /// Log module. `None` means ask interactively.
    pub mode: Option<GrammarMode>,
    /// Output directory, relative to the source directory unless absolute.
    pub output: String,
    /// Allow reusing a non-empty output directory.
    pub overwrite: bool,
    pub verbose: bool,
}

impl LogConvertConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub fn get_user_config() -> anyhow::Result<Self> {
        let Some(path) = crate::config::CONFIG_PATH.as_deref() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse config from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.logconvert)
            .context("Failed to parse logconvert config TOML")
    }
}

impl ConvertConfig {
    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or parsed.
    pub fn from_args(args: ConvertArgs) -> anyhow::Result<Self> {
        let user_config = LogConvertConfig::get_user_config()?;
        Self::from_parts(args, user_config)
    }

    /// Combine command line args with a user config.
    /// Command line values take precedence.
    ///
    /// # Errors
    /// Returns an error if the config file has an unknown log module.
    pub fn from_parts(args: ConvertArgs, user_config: LogConvertConfig) -> anyhow::Result<Self> {
        let mode = match args.mode {
            Some(mode) => Some(mode),
            None => user_config
                .mode
                .as_deref()
                .map(str::parse::<GrammarMode>)
                .transpose()
                .map_err(|e| anyhow::anyhow!("Invalid mode in config file: {e}"))?,
        };

        let extension = args
            .extension
            .or(user_config.extension)
            .map(|extension| extension.trim().trim_start_matches('.').to_string())
            .filter(|extension| !extension.is_empty())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        let output = args
            .output
            .or(user_config.output)
            .filter(|output| !output.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());

        Ok(Self {
            auto: args.auto || user_config.auto,
            dryrun: args.dryrun || user_config.dryrun,
            extension,
            mode,
            output,
            overwrite: args.force || user_config.overwrite,
            verbose: args.verbose || user_config.verbose,
        })
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            auto: false,
            dryrun: false,
            extension: DEFAULT_EXTENSION.to_string(),
            mode: None,
            output: DEFAULT_OUTPUT_DIR.to_string(),
            overwrite: false,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod logconvert_config_tests {
    use super::*;

    #[test]
    fn from_toml_str_parses_empty_config() {
        let config = LogConvertConfig::from_toml_str("").unwrap();
        assert!(!config.auto);
        assert!(!config.dryrun);
        assert!(!config.overwrite);
        assert!(!config.verbose);
        assert!(config.mode.is_none());
        assert!(config.output.is_none());
        assert!(config.extension.is_none());
    }

    #[test]
    fn from_toml_str_parses_logconvert_section() {
        let toml = r#"
[logconvert]
auto = true
dryrun = true
extension = "txt"
mode = "network"
output = "converted"
overwrite = true
verbose = true
"#;
        let config = LogConvertConfig::from_toml_str(toml).unwrap();
        assert!(config.auto);
        assert!(config.dryrun);
        assert_eq!(config.extension.as_deref(), Some("txt"));
        assert_eq!(config.mode.as_deref(), Some("network"));
        assert_eq!(config.output.as_deref(), Some("converted"));
        assert!(config.overwrite);
        assert!(config.verbose);
    }

    #[test]
    fn from_toml_str_invalid_toml_returns_error() {
        let result = LogConvertConfig::from_toml_str("this is not valid toml {{{");
        assert!(result.is_err());
    }

    #[test]
    fn from_toml_str_ignores_other_sections() {
        let toml = r"
[other_section]
some_value = true

[logconvert]
verbose = true
";
        let config = LogConvertConfig::from_toml_str(toml).unwrap();
        assert!(config.verbose);
        assert!(!config.auto);
    }
}
