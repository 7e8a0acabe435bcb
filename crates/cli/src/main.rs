use anyhow::Context;
use bracketfold_core::output::{to_json, to_yaml};
use bracketfold_core::{
    detect_language, format_output, format_ranges, render_file, visible_intervals, DocumentId,
    DocumentRanges, DocumentScanStats, FoldScanner, FoldingConfig, FoldingEngine, FoldingRange,
    Language, LineInterval, OutputFormat, RescanOutcome, ScanConfig, TextEdit, ViewId,
};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bracketfold")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bracket-based folding ranges with collapsed-text previews")]
#[command(long_about = "Computes folding ranges from bracket structure, #region comments and JSX \
    elements, the way an editor would show them folded:\n\n\
    - {…} blocks chained across `} else {`\n\
    - parameter name and object literal previews\n\
    - body line counts\n\n\
    Folding options are read from .bracketfold.toml in the scanned directory, or --config.")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Project root directory to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Json)]
    pub format: OutputFormatArg,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only scan specific language
    #[arg(long, value_enum)]
    pub language: Option<LanguageFilter>,

    /// Additional ignore patterns (gitignore style)
    #[arg(long, action = clap::ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Ignore file path (defaults to .gitignore)
    #[arg(long)]
    pub ignore_file: Option<PathBuf>,

    /// Include node_modules / .venv in scan
    #[arg(long)]
    pub include_deps: bool,

    /// Folding options file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show verbose progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Parallel threads (0 = auto)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the folding ranges of a file
    List {
        /// File to analyze
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Summary)]
        format: OutputFormatArg,
    },

    /// Render a file with ranges collapsed
    Render {
        /// File to render
        file: PathBuf,

        /// Collapse the range starting on this line (1-based); repeatable.
        /// Without it every outermost range is collapsed.
        #[arg(long = "fold", value_name = "LINE", action = clap::ArgAction::Append)]
        fold: Vec<usize>,

        /// Output with ANSI colors
        #[arg(long)]
        ansi: bool,

        /// Never color, even on a terminal
        #[arg(long)]
        no_color: bool,
    },

    /// Replay a script of edits and visibility reports through the incremental engine
    Replay {
        /// File providing the initial text
        file: PathBuf,

        /// YAML or JSON script with `steps`
        script: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Summary)]
        format: OutputFormatArg,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Summary,
    Ansi,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Yaml => OutputFormat::Yaml,
            OutputFormatArg::Summary => OutputFormat::Summary,
            OutputFormatArg::Ansi => OutputFormat::Ansi,
        }
    }
}

#[derive(ValueEnum, Clone, Debug)]
pub enum LanguageFilter {
    Python,
    JavaScript,
    TypeScript,
    Json,
    /// Alias for JS + TS
    Node,
}

/// One replay step; present fields apply in order: edits, folds, visibility.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Step {
    edit: Vec<TextEdit>,
    /// Start lines (0-based) to collapse; visibility is derived from them
    fold: Option<Vec<usize>>,
    visible: Option<Vec<LineInterval>>,
}

#[derive(Debug, Deserialize)]
struct Script {
    steps: Vec<Step>,
}

#[derive(Debug, Serialize)]
struct StepReport {
    step: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    rescan: Option<RescanOutcome>,
    ranges: usize,
    folded: Vec<usize>,
}

#[derive(Debug, Serialize)]
struct RangeState {
    #[serde(flatten)]
    range: FoldingRange,
    folded: bool,
}

#[derive(Debug, Serialize)]
struct ReplayReport {
    path: PathBuf,
    steps: Vec<StepReport>,
    ranges: Vec<RangeState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<DocumentScanStats>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match &args.command {
        Some(Commands::List { file, format }) => run_list(file, format.clone(), &args),
        Some(Commands::Render {
            file,
            fold,
            ansi,
            no_color,
        }) => run_render(file, fold, *ansi, *no_color, &args),
        Some(Commands::Replay {
            file,
            script,
            format,
        }) => run_replay(file, script, format.clone(), &args),
        None => run_scan(&args),
    }
}

/// `BRACKETFOLD_LOG`, then `RUST_LOG`, else `warn` (`info` with --verbose). Logs go to stderr.
fn init_tracing(verbose: bool) {
    let filter = std::env::var("BRACKETFOLD_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// `--config`, else `.bracketfold.toml` in `dir`, else defaults.
fn load_folding_config(args: &Args, dir: &Path) -> anyhow::Result<FoldingConfig> {
    if let Some(ref path) = args.config {
        return FoldingConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()));
    }
    Ok(FoldingConfig::discover(dir)?.unwrap_or_default())
}

fn parent_dir(file: &Path) -> &Path {
    file.parent().unwrap_or_else(|| Path::new("."))
}

fn write_output(output: &str, path: Option<&Path>, verbose: bool) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, output)?;
            if verbose {
                eprintln!("Output written to: {}", path.display());
            }
        }
        None => println!("{}", output),
    }
    Ok(())
}

fn run_scan(args: &Args) -> anyhow::Result<()> {
    let language_filter = args.language.as_ref().map(|l| match l {
        LanguageFilter::Python => vec![Language::Python],
        LanguageFilter::JavaScript => vec![Language::JavaScript],
        LanguageFilter::TypeScript => vec![Language::TypeScript],
        LanguageFilter::Json => vec![Language::Json],
        LanguageFilter::Node => vec![Language::JavaScript, Language::TypeScript],
    });

    let mut config = ScanConfig::new(args.path.clone())
        .with_ignore_patterns(args.ignore.clone())
        .with_include_deps(args.include_deps)
        .with_threads(args.threads)
        .with_folding(load_folding_config(args, &args.path)?);

    if let Some(languages) = language_filter {
        config = config.with_language_filter(languages);
    }

    if let Some(ref ignore_file) = args.ignore_file {
        config = config.with_ignore_file(ignore_file.clone());
    }

    let spinner = if args.verbose {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Scanning project...");
        Some(pb)
    } else {
        None
    };

    let scanner = FoldScanner::new(config)?;
    let result = scanner.scan()?;

    if let Some(ref pb) = spinner {
        pb.finish_with_message(format!(
            "Scanned {} files in {}ms",
            result.stats.total_files, result.metadata.scan_duration_ms
        ));
    }

    let output = format_output(&result, args.format.clone().into())?;
    write_output(&output, args.output.as_deref(), args.verbose)
}

fn run_list(file: &Path, format: OutputFormatArg, args: &Args) -> anyhow::Result<()> {
    let config = load_folding_config(args, parent_dir(file))?;
    let language = detect_language(file)?;
    let content = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;

    let mut engine = FoldingEngine::new(config)?;
    let id = DocumentId::new(file.to_string_lossy());
    let line_count = engine.open_document(id.clone(), language, &content).line_count();
    let ranges = engine.folding_ranges(&id)?.to_vec();

    let listing = DocumentRanges {
        path: file.to_path_buf(),
        language,
        line_count,
        ranges,
    };
    let output = format_ranges(&listing, format.into())?;
    write_output(&output, args.output.as_deref(), args.verbose)
}

fn run_render(file: &Path, fold: &[usize], ansi: bool, no_color: bool, args: &Args) -> anyhow::Result<()> {
    let config = load_folding_config(args, parent_dir(file))?;
    let fold_lines: Vec<usize> = fold.iter().map(|line| line.saturating_sub(1)).collect();
    let colored = ansi || (atty::is(atty::Stream::Stdout) && !no_color);

    let rendered = render_file(file, &config, &fold_lines, colored)?;
    println!("{}", rendered.content);

    if args.verbose {
        eprintln!(
            "\n--- {} folds applied, {} lines hidden ---",
            rendered.fold_count, rendered.lines_hidden
        );
    }

    Ok(())
}

fn load_script(path: &Path) -> anyhow::Result<Script> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let script = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&text)?,
        _ => serde_yaml::from_str(&text)?,
    };
    Ok(script)
}

fn run_replay(file: &Path, script_path: &Path, format: OutputFormatArg, args: &Args) -> anyhow::Result<()> {
    let config = load_folding_config(args, parent_dir(file))?;
    let debounce = Duration::from_millis(config.debounce_ms + 1);
    let language = detect_language(file)?;
    let content = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let script = load_script(script_path)?;

    let mut engine = FoldingEngine::new(config)?;
    let id = DocumentId::new(file.to_string_lossy());
    let view = ViewId::new("replay");
    engine.open_document(id.clone(), language, &content);
    engine.open_view(view.clone(), &id)?;

    let start = Instant::now();
    let mut reports = Vec::with_capacity(script.steps.len());

    for (index, step) in script.steps.iter().enumerate() {
        // each step lands in a fresh debounce window
        let now = start + debounce * index as u32;
        let mut rescan = None;

        if !step.edit.is_empty() {
            engine.apply_edits(&id, &step.edit)?;
            rescan = engine.last_rescan(&id);
            debug!(step = index, ?rescan, "edit applied");
        }

        let ranges = engine.folding_ranges(&id)?.to_vec();
        let line_count = engine.document(&id).map_or(0, |document| document.line_count());

        if let Some(ref lines) = step.fold {
            let folded: Vec<FoldingRange> = ranges
                .iter()
                .filter(|range| lines.contains(&range.start_line))
                .cloned()
                .collect();
            engine.visible_ranges_changed(&view, &visible_intervals(&folded, line_count), now)?;
        }
        if let Some(ref intervals) = step.visible {
            engine.visible_ranges_changed(&view, intervals, now)?;
        }

        let folded = engine
            .fold_state(&view)
            .map(|state| state.boundaries().iter().copied().collect())
            .unwrap_or_default();
        reports.push(StepReport {
            step: index,
            rescan,
            ranges: ranges.len(),
            folded,
        });
    }

    let ranges = engine.folding_ranges(&id)?.to_vec();
    let mut states = Vec::with_capacity(ranges.len());
    for range in ranges {
        let folded = engine.is_folded(&view, &range)?;
        states.push(RangeState { range, folded });
    }
    info!(steps = reports.len(), "replay finished");

    let report = ReplayReport {
        path: file.to_path_buf(),
        steps: reports,
        ranges: states,
        stats: engine.scan_stats(&id),
    };

    let output = match OutputFormat::from(format) {
        OutputFormat::Json => to_json(&report)?,
        OutputFormat::Yaml => to_yaml(&report)?,
        OutputFormat::Summary | OutputFormat::Ansi => replay_summary(&report),
    };
    write_output(&output, args.output.as_deref(), args.verbose)
}

fn replay_summary(report: &ReplayReport) -> String {
    let mut out = format!("Replay of {}\n\n", report.path.display());
    for step in &report.steps {
        let rescan = step
            .rescan
            .map(|outcome| format!("{:?}", outcome))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "step {}: rescan {} | {} ranges | folded {:?}\n",
            step.step, rescan, step.ranges, step.folded
        ));
    }
    out.push('\n');
    for state in &report.ranges {
        out.push_str(&format!(
            "{} {}-{} {}\n",
            if state.folded { "[+]" } else { "[-]" },
            state.range.start_line + 1,
            state.range.end_line + 1,
            state.range.collapsed_text
        ));
    }
    if let Some(stats) = report.stats {
        out.push_str(&format!(
            "\nlines scanned: {} | invalidations: {} | clears: {} | cached lines: {}\n",
            stats.cache.lines_scanned, stats.cache.invalidations, stats.cache.clears, stats.cached_lines
        ));
    }
    out
}
