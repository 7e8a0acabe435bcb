use crate::config::{IgnoreFilter, ScanConfig};
use crate::document::DocumentId;
use crate::models::{FoldMap, FoldStats, Language, ScanMetadata, SourceFile};
use crate::workspace::{EngineError, FoldingEngine};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
    #[error("Engine error: {0}")]
    EngineError(#[from] EngineError),
    #[error("Unsupported file type: {0}")]
    UnsupportedFile(PathBuf),
    #[error("Document not open: {0}")]
    UnknownDocument(DocumentId),
}

/// Language of a file from its extension
pub fn detect_language(path: &Path) -> Result<Language, ScanError> {
    path.extension()
        .and_then(|ext| Language::from_extension(&ext.to_string_lossy()))
        .ok_or_else(|| ScanError::UnsupportedFile(path.to_path_buf()))
}

/// Computes folding ranges for every supported file under a root
pub struct FoldScanner {
    config: ScanConfig,
    ignore_filter: IgnoreFilter,
}

impl FoldScanner {
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        let ignore_filter = IgnoreFilter::new(&config)?;
        Ok(Self {
            config,
            ignore_filter,
        })
    }

    /// Scan the project and return the fold map
    pub fn scan(&self) -> Result<FoldMap, ScanError> {
        let start = Instant::now();
        let source_files = self.find_source_files();
        info!(files = source_files.len(), root = %self.config.root.display(), "scanning");

        let files: Vec<SourceFile> = if self.config.threads == 1 {
            source_files
                .iter()
                .map(|(path, lang)| self.scan_source(path, *lang))
                .collect()
        } else {
            let pool = if self.config.threads > 0 {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.threads)
                    .build()
                    .ok()
            } else {
                None
            };

            match pool {
                Some(pool) => pool.install(|| {
                    source_files
                        .par_iter()
                        .map(|(path, lang)| self.scan_source(path, *lang))
                        .collect()
                }),
                None => source_files
                    .par_iter()
                    .map(|(path, lang)| self.scan_source(path, *lang))
                    .collect(),
            }
        };

        let mut stats = FoldStats::default();
        for file in &files {
            stats.add_file(file);
        }

        let duration = start.elapsed();
        let metadata = ScanMetadata {
            scan_duration_ms: duration.as_millis() as u64,
            files_per_second: if duration.as_secs_f64() > 0.0 {
                files.len() as f64 / duration.as_secs_f64()
            } else {
                0.0
            },
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        };

        Ok(FoldMap {
            root: self.config.root.clone(),
            files,
            stats,
            metadata,
        })
    }

    /// Scan a single file
    pub fn scan_file(&self, path: &Path) -> Result<SourceFile, ScanError> {
        let language = detect_language(path)?;
        Ok(self.scan_source(path, language))
    }

    fn find_source_files(&self) -> Vec<(PathBuf, Language)> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.config.root)
            .into_iter()
            .filter_entry(|e| !(e.file_type().is_dir() && self.ignore_filter.should_ignore(e.path(), true)))
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if entry.file_type().is_dir() || self.ignore_filter.should_ignore(path, false) {
                continue;
            }
            if !self
                .ignore_filter
                .matches_language_filter(path, &self.config.language_filter)
            {
                continue;
            }
            if let Ok(lang) = detect_language(path) {
                files.push((path.to_path_buf(), lang));
            }
        }

        files
    }

    fn scan_source(&self, path: &Path, language: Language) -> SourceFile {
        let relative = path
            .strip_prefix(&self.config.root)
            .unwrap_or(path)
            .to_path_buf();
        let mut file = SourceFile {
            path: relative,
            absolute_path: path.to_path_buf(),
            language,
            ranges: vec![],
            line_count: 0,
            parsed: false,
            error: None,
        };

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable file");
                file.error = Some(e.to_string());
                return file;
            }
        };
        file.line_count = content.lines().count();

        match self.folding_ranges(path, language, &content) {
            Ok(ranges) => {
                debug!(path = %path.display(), ranges = ranges.len(), "file scanned");
                file.ranges = ranges;
                file.parsed = true;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "scan failed");
                file.error = Some(e.to_string());
            }
        }
        file
    }

    fn folding_ranges(
        &self,
        path: &Path,
        language: Language,
        content: &str,
    ) -> Result<Vec<crate::models::FoldingRange>, ScanError> {
        let mut engine = FoldingEngine::new(self.config.folding.clone())?;
        let id = DocumentId::new(path.to_string_lossy());
        engine.open_document(id.clone(), language, content);
        Ok(engine.folding_ranges(&id)?.to_vec())
    }
}
