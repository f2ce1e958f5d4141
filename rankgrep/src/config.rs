use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// How invalid UTF-8 in a searched file is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Skip the file and record it as unreadable
    #[default]
    FailFast,
    /// Replace invalid sequences with U+FFFD and search anyway
    Lossy,
}

/// How carriage returns at the end of a line are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineEndingMode {
    /// Lines are split on `\n` only; a trailing `\r` stays matchable
    #[default]
    Preserve,
    /// One trailing `\r` is removed from every line before matching
    TrimCr,
}

/// What the walker does when a directory cannot be listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalkErrorPolicy {
    /// Abort the whole search with no partial results
    #[default]
    Abort,
    /// Log a warning and keep walking
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// The regular expression to search for
    #[serde(default)]
    pub pattern: String,

    /// Root directory to start search from
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Optional list of file extensions to include (e.g., ["rs", "toml"])
    /// If None, every regular file is searched
    #[serde(default)]
    pub file_extensions: Option<Vec<String>>,

    /// Patterns to ignore (supports glob syntax)
    /// Examples:
    /// - "**/target/**": Ignore everything under any target/
    /// - "**/*.min.js": Ignore all minified JS files
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Number of threads used to read and match files
    /// Defaults to number of CPU cores if not specified
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub encoding_mode: EncodingMode,

    #[serde(default)]
    pub line_endings: LineEndingMode,

    #[serde(default)]
    pub walk_errors: WalkErrorPolicy,

    /// Follow symbolic links while walking
    #[serde(default)]
    pub follow_links: bool,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            root_path: default_root_path(),
            file_extensions: None,
            ignore_patterns: Vec::new(),
            thread_count: default_thread_count(),
            log_level: default_log_level(),
            encoding_mode: EncodingMode::default(),
            line_endings: LineEndingMode::default(),
            walk_errors: WalkErrorPolicy::default(),
            follow_links: false,
        }
    }
}

impl SearchConfig {
    /// Creates a configuration for `pattern` rooted at `root_path`, all other
    /// settings at their defaults
    pub fn new(pattern: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.into(),
            root_path: root_path.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations, then `config_path`
    /// when given
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        // Default config locations
        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("rankgrep/config.yaml")),
            // Local config
            Some(PathBuf::from(".rankgrep.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli_config: SearchConfig) -> Self {
        // CLI values take precedence over config file values
        if !cli_config.pattern.is_empty() {
            self.pattern = cli_config.pattern;
        }
        if cli_config.root_path != default_root_path() {
            self.root_path = cli_config.root_path;
        }
        if cli_config.file_extensions.is_some() {
            self.file_extensions = cli_config.file_extensions;
        }
        if !cli_config.ignore_patterns.is_empty() {
            self.ignore_patterns = cli_config.ignore_patterns;
        }
        // Always use CLI thread count if specified
        self.thread_count = cli_config.thread_count;
        if cli_config.log_level != default_log_level() {
            self.log_level = cli_config.log_level;
        }
        if cli_config.encoding_mode != EncodingMode::default() {
            self.encoding_mode = cli_config.encoding_mode;
        }
        if cli_config.line_endings != LineEndingMode::default() {
            self.line_endings = cli_config.line_endings;
        }
        if cli_config.walk_errors != WalkErrorPolicy::default() {
            self.walk_errors = cli_config.walk_errors;
        }
        if cli_config.follow_links {
            self.follow_links = true;
        }
        self
    }
}
