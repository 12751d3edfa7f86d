use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use fmt_sync::config::{load_from_path, FormatterSpec, ReformatConfig};
use fmt_sync::{
    reformat_document, FileDocument, FormatterInvocation, Mode, ReformatError, ReformatOutcome,
};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "fmt-sync")]
#[command(
    about = "Reformat source files, rewriting only the lines the formatter changed",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Files or directories to reformat
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Custom formatter command, run as `<command> <file>`
    #[arg(short, long)]
    command: Option<String>,

    /// Space-separated filename suffixes handled by --command
    #[arg(short, long, requires = "command")]
    extensions: Option<String>,

    /// Only resynchronise the leading region (package clause and imports)
    #[arg(short, long)]
    top_region: bool,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report files that would change without modifying them
    #[arg(long, conflicts_with = "diff")]
    check: bool,

    /// Show unified diff of changes without modifying files
    #[arg(short, long)]
    diff: bool,

    /// Print the planned edit operations as JSON without modifying files
    #[arg(long, conflicts_with_all = ["check", "diff"])]
    json: bool,

    /// Verbose logging (overridden by FMT_SYNC_LOG)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn dry_run(&self) -> bool {
        self.check || self.diff || self.json
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = build_config(&cli)?;
    let mode = config.mode();

    let files = collect_files(&cli.paths, &config)?;
    if files.is_empty() {
        println!("{}", "No files with a configured formatter".yellow());
        return Ok(());
    }

    let mut changed = 0;
    let mut unchanged = 0;
    let mut failed = 0;

    for (file, spec) in &files {
        let formatter = spec.to_formatter();
        let result = if cli.dry_run() {
            preview(&cli, file, &formatter, &mode)
        } else {
            let mut doc = FileDocument::new(file);
            reformat_document(&mut doc, file, &formatter, &mode)
        };

        match result {
            Ok(ReformatOutcome::Applied { operations, skipped }) => {
                changed += 1;
                if cli.check {
                    println!("{} {}: would reformat", "✗".yellow(), file.display());
                } else if !cli.dry_run() {
                    println!(
                        "{} {}: {} edit(s) applied",
                        "✓".green(),
                        file.display(),
                        operations
                    );
                }
                if skipped > 0 {
                    eprintln!(
                        "{}",
                        format!("  {} hunk(s) could not be addressed and were skipped", skipped)
                            .yellow()
                    );
                }
            }
            Ok(ReformatOutcome::Unchanged) => {
                unchanged += 1;
                tracing::debug!(path = %file.display(), "unchanged");
            }
            Err(e) => {
                failed += 1;
                report_error(file, &e);
            }
        }
    }

    if !cli.json {
        println!();
        println!("{}", "Summary:".bold());
        let verb = if cli.dry_run() { "would change" } else { "reformatted" };
        println!("  {} {}", format!("{}", changed).green(), verb);
        println!("  {} unchanged", format!("{}", unchanged).normal());
        println!("  {} failed", format!("{}", failed).red());
    }

    if failed > 0 || (cli.check && changed > 0) {
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("FMT_SYNC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Helper: Merge the configuration file with command-line overrides
fn build_config(cli: &Cli) -> Result<ReformatConfig> {
    let mut config = match &cli.config {
        Some(path) => load_from_path(path)?,
        None => ReformatConfig::default(),
    };

    if let Some(command) = &cli.command {
        // Without -e the custom command takes over every built-in extension.
        let extensions: Vec<String> = match &cli.extensions {
            Some(exts) => exts.split_whitespace().map(str::to_string).collect(),
            None => fmt_sync::config::C_EXTENSIONS
                .iter()
                .chain(fmt_sync::config::GO_EXTENSIONS)
                .map(|ext| ext.to_string())
                .collect(),
        };
        if extensions.is_empty() {
            anyhow::bail!("--extensions must name at least one suffix");
        }
        config.prepend_formatter(FormatterSpec {
            name: Some("custom".to_string()),
            extensions,
            command: command.clone(),
            args: Vec::new(),
        });
    }

    if cli.top_region {
        config.mode = fmt_sync::config::SyncMode::TopRegion;
    }

    Ok(config)
}

/// Helper: Expand directories and keep files that have a formatter
fn collect_files(
    paths: &[PathBuf],
    config: &ReformatConfig,
) -> Result<Vec<(PathBuf, FormatterSpec)>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.with_context(|| format!("walking {}", path.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if let Some(spec) = config.formatter_for(entry.path()) {
                    files.push((entry.path().to_path_buf(), spec));
                }
            }
        } else if let Some(spec) = config.formatter_for(path) {
            files.push((path.clone(), spec));
        } else {
            tracing::debug!(path = %path.display(), "no formatter configured");
        }
    }

    Ok(files)
}

/// Helper: Compute the edits for one file without touching it
fn preview(
    cli: &Cli,
    file: &Path,
    formatter: &dyn FormatterInvocation,
    mode: &Mode,
) -> Result<ReformatOutcome, ReformatError> {
    let old = fs::read(file).map_err(|source| {
        ReformatError::Read(fmt_sync::DocumentError::Read {
            path: file.to_path_buf(),
            source,
        })
    })?;
    let new = formatter.format(file)?;

    let plan = mode.plan(&old, &new);
    if plan.is_empty() {
        return Ok(ReformatOutcome::Unchanged);
    }

    if cli.json {
        let report = serde_json::json!({
            "file": file.display().to_string(),
            "plan": plan,
        });
        println!("{}", report);
    } else if cli.diff {
        if let Some(patched) = plan.apply_to(&old) {
            display_diff(
                file,
                &String::from_utf8_lossy(&old),
                &String::from_utf8_lossy(&patched),
            );
        }
    }

    Ok(ReformatOutcome::Applied {
        operations: plan.len(),
        skipped: plan.skipped(),
    })
}

/// Helper: Show unified diff between original and reformatted content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (formatted)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
        if idx > 0 {
            println!("{}", "...".dimmed());
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let line = match change.tag() {
                    ChangeTag::Delete => format!("-{}", change).red(),
                    ChangeTag::Insert => format!("+{}", change).green(),
                    ChangeTag::Equal => format!(" {}", change).normal(),
                };
                print!("{}", line);
                if change.missing_newline() {
                    println!();
                }
            }
        }
    }
}

fn report_error(file: &Path, e: &ReformatError) {
    match e {
        // Formatter diagnostics already name the file.
        ReformatError::Formatter(err) if err.is_quiet() => eprint!("{}", err),
        _ if e.is_quiet() => eprintln!("{}: {}", file.display(), e),
        _ => eprintln!("{} {}: {}", "✗".red(), file.display(), e),
    }
    if e.is_stale() {
        eprintln!("  {}", "File changed while the formatter was running".yellow());
    }
}
