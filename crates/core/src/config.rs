use crate::models::Language;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up by [`FoldingConfig::discover`].
pub const CONFIG_FILE_NAME: &str = ".bracketfold.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to build glob pattern: {0}")]
    GlobError(#[from] globset::Error),
    #[error("Failed to parse gitignore: {0}")]
    GitignoreError(#[from] ignore::Error),
    #[error("Failed to parse config file {path}: {source}")]
    TomlError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Options controlling range synthesis, fold inference and decorations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldingConfig {
    /// Hide the closing bracket's line as part of the fold
    pub fold_closing_brackets: bool,
    /// Show the brackets around the collapsed text, starting at the open bracket
    pub show_folded_brackets: bool,
    /// Collapsed text reports the number of hidden body lines
    pub show_folded_body_lines_count: bool,
    /// Preview parameter names of folded `(` pairs
    pub show_function_parameters: bool,
    /// Preview the first entry of folded object literals
    pub show_object_previews: bool,
    /// Splice ranges starting on a close bracket's line into its text
    pub chain_folding_ranges: bool,
    /// Fold `#region` blocks down to their description
    pub show_only_regions_descriptions: bool,
    /// Language ids that produce no ranges
    pub excluded_languages: Vec<String>,
    /// How close to the last line a range must end for the fold-state fallback
    pub end_of_document_tolerance: usize,
    /// Decoration refresh window in milliseconds
    pub debounce_ms: u64,
}

impl Default for FoldingConfig {
    fn default() -> Self {
        Self {
            fold_closing_brackets: false,
            show_folded_brackets: true,
            show_folded_body_lines_count: false,
            show_function_parameters: false,
            show_object_previews: false,
            chain_folding_ranges: true,
            show_only_regions_descriptions: false,
            excluded_languages: vec![],
            end_of_document_tolerance: 1,
            debounce_ms: 100,
        }
    }
}

impl FoldingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a TOML config file; absent keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| ConfigError::TomlError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `.bracketfold.toml` from `root` if present.
    pub fn discover(root: &Path) -> Result<Option<Self>, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn is_excluded(&self, language: Language) -> bool {
        self.excluded_languages
            .iter()
            .any(|id| id == language.as_str())
    }

    pub fn with_fold_closing_brackets(mut self, enabled: bool) -> Self {
        self.fold_closing_brackets = enabled;
        self
    }

    pub fn with_show_folded_brackets(mut self, enabled: bool) -> Self {
        self.show_folded_brackets = enabled;
        self
    }

    pub fn with_show_folded_body_lines_count(mut self, enabled: bool) -> Self {
        self.show_folded_body_lines_count = enabled;
        self
    }

    pub fn with_show_function_parameters(mut self, enabled: bool) -> Self {
        self.show_function_parameters = enabled;
        self
    }

    pub fn with_show_object_previews(mut self, enabled: bool) -> Self {
        self.show_object_previews = enabled;
        self
    }

    pub fn with_chain_folding_ranges(mut self, enabled: bool) -> Self {
        self.chain_folding_ranges = enabled;
        self
    }

    pub fn with_show_only_regions_descriptions(mut self, enabled: bool) -> Self {
        self.show_only_regions_descriptions = enabled;
        self
    }

    pub fn with_excluded_languages(mut self, languages: Vec<String>) -> Self {
        self.excluded_languages = languages;
        self
    }

    pub fn with_end_of_document_tolerance(mut self, tolerance: usize) -> Self {
        self.end_of_document_tolerance = tolerance;
        self
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }
}

/// Configuration for scanning
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Root directory to scan
    pub root: PathBuf,
    /// Filter to specific languages
    pub language_filter: Option<Vec<Language>>,
    /// Additional ignore patterns (glob style)
    pub ignore_patterns: Vec<String>,
    /// Custom ignore file path
    pub ignore_file: Option<PathBuf>,
    /// Include node_modules/.venv in scan
    pub include_deps: bool,
    /// Number of threads (0 = auto)
    pub threads: usize,
    /// Options used for every scanned file
    pub folding: FoldingConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            language_filter: None,
            ignore_patterns: vec![],
            ignore_file: None,
            include_deps: false,
            threads: 0,
            folding: FoldingConfig::default(),
        }
    }
}

impl ScanConfig {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    pub fn with_language_filter(mut self, languages: Vec<Language>) -> Self {
        self.language_filter = Some(languages);
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn with_ignore_file(mut self, path: PathBuf) -> Self {
        self.ignore_file = Some(path);
        self
    }

    pub fn with_include_deps(mut self, include: bool) -> Self {
        self.include_deps = include;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_folding(mut self, folding: FoldingConfig) -> Self {
        self.folding = folding;
        self
    }
}

/// Filter for ignoring files and directories
pub struct IgnoreFilter {
    gitignore: Option<Gitignore>,
    custom_globs: GlobSet,
    default_ignores: GlobSet,
}

impl IgnoreFilter {
    pub fn new(config: &ScanConfig) -> Result<Self, ConfigError> {
        let gitignore_path = config
            .ignore_file
            .clone()
            .unwrap_or_else(|| config.root.join(".gitignore"));
        let gitignore = if gitignore_path.exists() {
            let mut builder = GitignoreBuilder::new(&config.root);
            if let Some(err) = builder.add(&gitignore_path) {
                return Err(err.into());
            }
            Some(builder.build()?)
        } else {
            None
        };

        let mut custom_builder = GlobSetBuilder::new();
        for pattern in &config.ignore_patterns {
            custom_builder.add(Glob::new(pattern)?);
        }
        let custom_globs = custom_builder.build()?;

        let mut default_builder = GlobSetBuilder::new();
        if !config.include_deps {
            for pattern in [
                "**/node_modules/**",
                "**/.venv/**",
                "**/venv/**",
                "**/__pycache__/**",
                "**/dist/**",
                "**/build/**",
                "**/.git/**",
                "**/target/**",
                "**/*.min.js",
                "**/package-lock.json",
            ] {
                default_builder.add(Glob::new(pattern)?);
            }
        }
        let default_ignores = default_builder.build()?;

        Ok(Self {
            gitignore,
            custom_globs,
            default_ignores,
        })
    }

    /// Check if a path should be ignored
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        let path_str = path.to_string_lossy();

        if self.default_ignores.is_match(&*path_str) || self.custom_globs.is_match(&*path_str) {
            return true;
        }

        match self.gitignore {
            Some(ref gi) => gi.matched(path, is_dir).is_ignore(),
            None => false,
        }
    }

    /// Check if a file extension matches the language filter
    pub fn matches_language_filter(&self, path: &Path, filter: &Option<Vec<Language>>) -> bool {
        let language = path
            .extension()
            .and_then(|ext| Language::from_extension(&ext.to_string_lossy()));
        match (filter, language) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(languages), Some(lang)) => languages.contains(&lang),
        }
    }
}
