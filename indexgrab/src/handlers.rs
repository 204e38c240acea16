use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use indexgrab_core::report::{ReportFormat, render_report, write_report};
use indexgrab_core::run::{RunMode, RunOptions, RunReport, execute_download, execute_run};
use indexgrab_scanner::{FilterSpec, RetryPolicy};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Every download succeeded (or nothing needed downloading).
pub const EXIT_OK: i32 = 0;
/// The run could not start or the root listing was unreachable.
pub const EXIT_FATAL: i32 = 1;
/// The run finished but some files failed to download.
pub const EXIT_PARTIAL: i32 = 2;

/// Install the fmt subscriber. `RUST_LOG` wins over the `-v` count.
pub fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// Helper functions for the download handler

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &Path) -> anyhow::Result<Vec<Url>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;

    let urls: Vec<Url> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        bail!("No valid URLs found in {}", path.display());
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<Url> {
    let parsed = Url::parse(line)
        .ok()
        .filter(|u| u.has_host())
        .or_else(|| Url::parse(&format!("http://{}", line)).ok());

    match parsed {
        Some(url) if indexgrab_scanner::classify::is_well_formed(&url) => Some(url),
        _ => {
            eprintln!("{} Skipping invalid URL '{}'", "⚠".yellow(), line);
            None
        }
    }
}

/// Build the file filter from `-p` and `-e`, when the subcommand has them
pub fn build_filter(args: &ArgMatches) -> anyhow::Result<FilterSpec> {
    let mut filter = FilterSpec::new();

    if let Ok(Some(pattern)) = args.try_get_one::<String>("pattern") {
        filter = filter
            .with_pattern(pattern)
            .with_context(|| format!("Invalid --pattern '{}'", pattern))?;
    }

    if let Ok(Some(extensions)) = args.try_get_many::<String>("extension") {
        filter = filter.with_extensions(extensions.cloned());
    }

    Ok(filter)
}

/// Expand `~` in a destination directory
pub fn expand_destination(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Collect run options shared by all subcommands. Missing args fall back to defaults.
pub fn build_run_options(args: &ArgMatches, mode: RunMode, quiet: bool) -> anyhow::Result<RunOptions> {
    let mut options = RunOptions {
        mode,
        show_progress: !quiet,
        ..RunOptions::default()
    };

    if let Ok(Some(dest)) = args.try_get_one::<String>("destination") {
        options.destination = expand_destination(dest);
    }
    if let Ok(Some(workers)) = args.try_get_one::<usize>("threads") {
        options.workers = *workers;
    }
    if let Ok(Some(retries)) = args.try_get_one::<u32>("retries") {
        options.retry = RetryPolicy::new(*retries);
    }
    if let Ok(Some(timeout)) = args.try_get_one::<u64>("timeout") {
        options.timeout_secs = *timeout;
    }
    if let Ok(Some(depth)) = args.try_get_one::<usize>("max-depth") {
        options.max_depth = Some(*depth);
    }
    options.filter = build_filter(args)?;

    Ok(options)
}

/// Map a finished run to the process exit code
pub fn exit_code(report: &RunReport) -> i32 {
    if report.has_failures() {
        EXIT_PARTIAL
    } else {
        EXIT_OK
    }
}

fn print_run_header(action: &str, target: &str, options: &RunOptions) {
    println!("\n{} {}", action.bright_white().bold(), target.bright_cyan());
    println!("Workers: {}", options.workers);
    if options.mode != RunMode::ListOnly {
        println!("Destination: {}", options.destination.display());
        println!("Attempts per file: {}", options.retry.max_attempts());
    }
    if let Some(depth) = options.max_depth {
        println!("Max depth: {}", depth);
    }
    println!("Mode: {}\n", options.mode.as_str());
}

/// Render the report to `-o` or stdout and return the exit code
pub fn emit_report(args: &ArgMatches, report: &RunReport) -> anyhow::Result<i32> {
    let format = args
        .get_one::<String>("format")
        .map(|f| ReportFormat::from_str(f))
        .transpose()
        .map_err(anyhow::Error::msg)?
        .unwrap_or(ReportFormat::Text);

    let rendered = render_report(report, format).context("Failed to serialize report")?;

    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            write_report(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", rendered),
    }

    Ok(exit_code(report))
}

pub async fn handle_fetch(args: &ArgMatches, quiet: bool) -> anyhow::Result<i32> {
    let url = args
        .get_one::<Url>("url")
        .context("--url is required")?
        .clone();
    let mode = if args.get_flag("stream") {
        RunMode::Streaming
    } else {
        RunMode::TwoPhase
    };
    let options = build_run_options(args, mode, quiet)?;

    if !quiet {
        print_run_header("Mirroring", url.as_str(), &options);
    }
    info!("fetch {} into {}", url, options.destination.display());

    let report = execute_run(url.clone(), options, None)
        .await
        .with_context(|| format!("Crawl of {} failed", url))?;

    if !quiet {
        println!("\n{} Mirror complete!\n", "✓".green().bold());
    }
    emit_report(args, &report)
}

pub async fn handle_list(args: &ArgMatches, quiet: bool) -> anyhow::Result<i32> {
    let url = args
        .get_one::<Url>("url")
        .context("--url is required")?
        .clone();
    let options = build_run_options(args, RunMode::ListOnly, quiet)?;

    if !quiet {
        print_run_header("Listing", url.as_str(), &options);
    }

    let report = execute_run(url.clone(), options, None)
        .await
        .with_context(|| format!("Crawl of {} failed", url))?;

    if !quiet {
        println!("\n{} Listing complete!\n", "✓".green().bold());
    }
    emit_report(args, &report)
}

pub async fn handle_download(args: &ArgMatches, quiet: bool) -> anyhow::Result<i32> {
    let input = args
        .get_one::<PathBuf>("input")
        .context("--input is required")?;
    let urls = load_urls_from_file(input)?;
    let options = build_run_options(args, RunMode::TwoPhase, quiet)?;

    if !quiet {
        print_run_header(
            "Downloading",
            &format!("{} URL(s) from {}", urls.len(), input.display()),
            &options,
        );
    }

    let report = execute_download(urls, options, None).await?;

    if !quiet {
        println!("\n{} Download complete!\n", "✓".green().bold());
    }
    emit_report(args, &report)
}
