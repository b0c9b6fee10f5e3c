use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// How the pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Exact byte-sequence containment search.
    Literal,
    /// Compiled regular-expression search.
    #[default]
    Regex,
}

/// What to do when a directory cannot be listed during enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WalkErrorPolicy {
    /// Log the failure, record it in the summary, keep walking.
    #[default]
    Skip,
    /// Fail the whole run on the first unreadable directory or root.
    Abort,
}

/// Configuration for one search run. Built once before scanning starts and
/// never mutated afterwards; the engine, walker and scanner all borrow it.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of
/// precedence:
/// 1. Custom config file specified via `--config`
/// 2. Local `.seekgrep.yaml` in the current directory
/// 3. Global `$HOME/.config/seekgrep/config.yaml`
///
/// # Configuration Format
///
/// YAML, for example:
/// ```yaml
/// mode: literal
/// recursive: true
/// buffer_size: 65536
/// exclude:
///   - "*.min.js"
///   - ".git"
/// walk_errors: skip
/// ```
///
/// CLI arguments take precedence over config file values; the merging
/// behavior is defined in [`SearchConfig::merge_with_cli`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// The pattern to search for (regex unless `mode` is `literal`)
    #[serde(default)]
    pub pattern: String,

    /// Literal substring search vs. regular-expression search
    #[serde(default)]
    pub mode: MatchMode,

    /// Files or directories to search, processed in order
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,

    /// Whether to descend into subdirectories
    #[serde(default)]
    pub recursive: bool,

    /// Number of worker threads pulling files off the task stream
    /// Defaults to the number of CPU cores
    #[serde(default = "default_thread_count")]
    pub threads: NonZeroUsize,

    /// Bytes read per chunk per file
    #[serde(default = "default_buffer_size")]
    pub buffer_size: NonZeroUsize,

    /// Stop reading a file once this many bytes have been consumed.
    /// `None` means the whole file is scanned.
    #[serde(default)]
    pub max_file_bytes: Option<u64>,

    /// Glob patterns for paths to skip; matching directories are not
    /// descended into
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Policy for unreadable directories encountered while enumerating
    #[serde(default)]
    pub walk_errors: WalkErrorPolicy,
}

fn default_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_buffer_size() -> NonZeroUsize {
    NonZeroUsize::new(10240).unwrap()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            mode: MatchMode::default(),
            roots: default_roots(),
            recursive: false,
            threads: default_thread_count(),
            buffer_size: default_buffer_size(),
            max_file_bytes: None,
            exclude: Vec::new(),
            walk_errors: WalkErrorPolicy::default(),
        }
    }
}

impl SearchConfig {
    /// Creates a configuration with the given pattern and roots
    pub fn new(pattern: impl Into<String>, roots: Vec<PathBuf>) -> Self {
        Self {
            pattern: pattern.into(),
            roots,
            ..Default::default()
        }
    }

    /// Builder method to set the match mode
    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder method to enable recursive descent
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Builder method to set the worker count
    pub fn with_threads(mut self, threads: NonZeroUsize) -> Self {
        self.threads = threads;
        self
    }

    /// Builder method to set the per-read buffer size
    pub fn with_buffer_size(mut self, buffer_size: NonZeroUsize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Builder method to set exclude globs
    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from a specific file, falling back to the default
    /// locations when `config_path` is `None`
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("seekgrep/config.yaml")),
            // Local config
            Some(PathBuf::from(".seekgrep.yaml")),
            // Custom config
            config_path.map(PathBuf::from),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: SearchConfig) -> Self {
        // CLI values take precedence over config file values
        if !cli.pattern.is_empty() {
            self.pattern = cli.pattern;
        }
        if cli.mode != MatchMode::default() {
            self.mode = cli.mode;
        }
        if cli.roots != default_roots() {
            self.roots = cli.roots;
        }
        if cli.recursive {
            self.recursive = true;
        }
        // Always use the CLI thread count
        self.threads = cli.threads;
        if cli.buffer_size != default_buffer_size() {
            self.buffer_size = cli.buffer_size;
        }
        if cli.max_file_bytes.is_some() {
            self.max_file_bytes = cli.max_file_bytes;
        }
        if !cli.exclude.is_empty() {
            self.exclude = cli.exclude;
        }
        if cli.walk_errors != WalkErrorPolicy::default() {
            self.walk_errors = cli.walk_errors;
        }
        self
    }
}
