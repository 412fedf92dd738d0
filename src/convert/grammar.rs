use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use regex::Regex;

/// Which ZNC log module wrote the logs.
///
/// The module determines the file naming scheme in ZNC 1.4
/// and the directory layout in ZNC 1.6.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GrammarMode {
    /// `<user>_<network>_<window>_<date>.log` -> `<user>/<network>/<window>/<date>.log`
    #[default]
    Global,
    /// `<window>_<date>.log` -> `<window>/<date>.log`
    Network,
    /// `<network>_<window>_<date>.log` -> `<network>/<window>/<date>.log`
    User,
}

/// Log date parsed from a `YYYYMMDD` file name suffix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LogDate(String);

/// Fields parsed from a ZNC 1.4 log file name.
/// Each variant only carries the fields its naming scheme defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedName {
    Global {
        user: String,
        network: String,
        window: String,
        date: LogDate,
    },
    Network {
        window: String,
        date: LogDate,
    },
    User {
        network: String,
        window: String,
        date: LogDate,
    },
}

/// Compiled file name pattern for one mode.
#[derive(Debug, Clone)]
pub struct Grammar {
    mode: GrammarMode,
    extension: String,
    regex: Regex,
}

/// Reason for leaving a file where it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Entry is a directory or something else that can't be moved as a log
    NotAFile,
    /// File name does not follow the naming scheme of the mode
    NoMatch(GrammarMode),
    MissingWindow,
    MissingDate,
    /// Date is not exactly eight digits
    InvalidDate(String),
    /// Field would produce an empty, `.` or `..` directory name
    InvalidPathComponent(String),
}

impl GrammarMode {
    /// Parse an interactive mode selection.
    ///
    /// Only the first letter matters and case is ignored. Empty input selects `Global`.
    ///
    /// ```rust
    /// use znc_logs::convert::GrammarMode;
    ///
    /// assert_eq!(GrammarMode::from_selection(""), Some(GrammarMode::Global));
    /// assert_eq!(GrammarMode::from_selection("net"), Some(GrammarMode::Network));
    /// assert_eq!(GrammarMode::from_selection("Users"), Some(GrammarMode::User));
    /// assert_eq!(GrammarMode::from_selection("x"), None);
    /// ```
    #[must_use]
    pub fn from_selection(input: &str) -> Option<Self> {
        match input.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
            None | Some('g') => Some(Self::Global),
            Some('n') => Some(Self::Network),
            Some('u') => Some(Self::User),
            Some(_) => None,
        }
    }

    /// File name pattern for this mode.
    ///
    /// User and network names can't contain underscores,
    /// the window name is everything between them and the final `_<digits>` date.
    fn pattern(self, extension: &str) -> String {
        let extension = regex::escape(&extension.to_lowercase());
        match self {
            Self::Global => {
                format!(r"^(?P<user>[^_]+)_(?P<network>[^_]+)_(?P<window>.+)_(?P<date>[0-9]+)\.{extension}$")
            }
            Self::Network => format!(r"^(?P<window>.+)_(?P<date>[0-9]+)\.{extension}$"),
            Self::User => format!(r"^(?P<network>[^_]+)_(?P<window>.+)_(?P<date>[0-9]+)\.{extension}$"),
        }
    }

    /// Compile the file name grammar for this mode.
    ///
    /// # Errors
    /// Returns an error if the pattern can't be compiled.
    pub fn grammar(self, extension: &str) -> Result<Grammar> {
        let regex = Regex::new(&self.pattern(extension))
            .with_context(|| format!("Failed to create regex pattern for {self} logs"))?;
        Ok(Grammar {
            mode: self,
            extension: extension.to_lowercase(),
            regex,
        })
    }
}

impl FromStr for GrammarMode {
    type Err = String;

    /// Parse a full mode name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "network" => Ok(Self::Network),
            "user" => Ok(Self::User),
            _ => Err(format!("Unknown log module '{s}', expected global, network or user")),
        }
    }
}

impl fmt::Display for GrammarMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "Global"),
            Self::Network => write!(f, "Network"),
            Self::User => write!(f, "User"),
        }
    }
}

impl LogDate {
    /// Parse a date consisting of exactly eight ASCII digits.
    #[must_use]
    pub fn parse(date: &str) -> Option<Self> {
        (date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit())).then(|| Self(date.to_string()))
    }
}

impl fmt::Display for LogDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", &self.0[..4], &self.0[4..6], &self.0[6..8])
    }
}

impl ParsedName {
    #[must_use]
    pub fn window(&self) -> &str {
        match self {
            Self::Global { window, .. } | Self::Network { window, .. } | Self::User { window, .. } => window,
        }
    }

    #[must_use]
    pub const fn date(&self) -> &LogDate {
        match self {
            Self::Global { date, .. } | Self::Network { date, .. } | Self::User { date, .. } => date,
        }
    }

    /// Directory names in destination order.
    #[must_use]
    pub fn components(&self) -> Vec<&str> {
        match self {
            Self::Global {
                user, network, window, ..
            } => vec![user.as_str(), network.as_str(), window.as_str()],
            Self::Network { window, .. } => vec![window.as_str()],
            Self::User { network, window, .. } => vec![network.as_str(), window.as_str()],
        }
    }

    /// Destination directory relative to the output root.
    #[must_use]
    pub fn directory(&self) -> PathBuf {
        self.components().into_iter().collect()
    }

    /// Destination path relative to the output root, for example `alice/freenode/#chan/2016-01-15.log`.
    #[must_use]
    pub fn destination(&self, extension: &str) -> PathBuf {
        self.directory().join(format!("{}.{extension}", self.date()))
    }
}

impl Grammar {
    #[must_use]
    pub const fn mode(&self) -> GrammarMode {
        self.mode
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Parse a file name into its fields.
    ///
    /// ```rust
    /// use std::path::Path;
    /// use znc_logs::convert::GrammarMode;
    ///
    /// let grammar = GrammarMode::Global.grammar("log").unwrap();
    /// let parsed = grammar.parse("alice_freenode_#chan_20160115.log").unwrap();
    /// assert_eq!(parsed.destination("log"), Path::new("alice/freenode/#chan/2016-01-15.log"));
    /// ```
    ///
    /// # Errors
    /// Returns the reason the file should be skipped.
    pub fn parse(&self, name: &str) -> Result<ParsedName, SkipReason> {
        let Some(captures) = self.regex.captures(name) else {
            return Err(SkipReason::NoMatch(self.mode));
        };
        let field = |key: &str| {
            captures
                .name(key)
                .map(|m| m.as_str().to_string())
                .filter(|value| !value.is_empty())
        };

        let window = field("window").ok_or(SkipReason::MissingWindow)?;
        let date = field("date").ok_or(SkipReason::MissingDate)?;
        let date = LogDate::parse(&date).ok_or_else(|| SkipReason::InvalidDate(date.clone()))?;

        let parsed = match self.mode {
            GrammarMode::Global => ParsedName::Global {
                user: field("user").unwrap_or_default(),
                network: field("network").unwrap_or_default(),
                window,
                date,
            },
            GrammarMode::Network => ParsedName::Network { window, date },
            GrammarMode::User => ParsedName::User {
                network: field("network").unwrap_or_default(),
                window,
                date,
            },
        };

        if let Some(invalid) = parsed
            .components()
            .into_iter()
            .find(|component| matches!(*component, "" | "." | ".."))
        {
            return Err(SkipReason::InvalidPathComponent(invalid.to_string()));
        }

        Ok(parsed)
    }

    /// Destination path relative to the output root for the given file name.
    ///
    /// # Errors
    /// Returns the reason the file should be skipped.
    pub fn destination(&self, name: &str) -> Result<PathBuf, SkipReason> {
        self.parse(name).map(|parsed| parsed.destination(&self.extension))
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAFile => write!(f, "is not a file"),
            Self::NoMatch(mode) => write!(f, "did not match the {mode} log naming scheme"),
            Self::MissingWindow => write!(f, "doesn't have a window"),
            Self::MissingDate => write!(f, "doesn't have a date"),
            Self::InvalidDate(date) => write!(f, "has an invalid date '{date}'"),
            Self::InvalidPathComponent(component) => {
                write!(f, "would create an invalid directory name '{component}'")
            }
        }
    }
}
