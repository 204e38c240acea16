// Report generation from a finished run

use crate::run::{RunReport, extract_url_path};
use colored::Colorize;
use indexgrab_scanner::DownloadOutcome;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use url::Url;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("Unknown report format '{}'", other)),
        }
    }
}

pub fn render_report(report: &RunReport, format: ReportFormat) -> serde_json::Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_run_report(report)),
        ReportFormat::Json => serde_json::to_string_pretty(report),
    }
}

pub fn write_report(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Human-readable summary, grouped by host
pub fn generate_run_report(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push_str("\n\n# Summary:\n");

    if let Some(ref root) = report.root {
        out.push_str(&format!("  Root: {}\n", root));
    }
    out.push_str(&format!("  Mode: {}\n", report.mode.as_str()));
    out.push_str(&format!(
        "  Started: {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("  Duration: {:.2}s\n", report.elapsed_secs()));
    out.push_str(&format!("  Files discovered: {}\n", report.discovered.len()));

    if !report.downloads.is_empty() {
        out.push_str(&format!(
            "  Destination: {}\n",
            report.destination.display()
        ));
        out.push_str(&format!(
            "  Downloaded: {}\n",
            report.downloads.succeeded().to_string().green()
        ));
        let failed = report.downloads.failed();
        let failed = if failed > 0 {
            failed.to_string().red()
        } else {
            failed.to_string().normal()
        };
        out.push_str(&format!("  Failed: {}\n", failed));
    }

    out.push('\n');
    out.push_str(RULE);
    out.push_str("\n\n");

    let mut by_host: BTreeMap<String, Vec<&Url>> = BTreeMap::new();
    for url in &report.discovered {
        let host = match url.port() {
            Some(port) => format!("{}:{}", url.host_str().unwrap_or("unknown"), port),
            None => url.host_str().unwrap_or("unknown").to_string(),
        };
        by_host.entry(host).or_default().push(url);
    }

    for (host, urls) in by_host.iter() {
        out.push_str(&format!("## {}\n", host));
        out.push_str(&format!("  {} files\n\n", urls.len()));

        for url in urls {
            let path = extract_url_path(url.as_str());
            let line = match report.downloads.get(url) {
                Some(DownloadOutcome::Success { path: local, attempts }) => {
                    let mut line = format!(
                        "  {} {} {} {}",
                        "✓".green(),
                        path,
                        "→".bright_black(),
                        local.display()
                    );
                    if *attempts > 1 {
                        line.push_str(&format!(" ({} attempts)", attempts).bright_black().to_string());
                    }
                    line
                }
                Some(DownloadOutcome::Failed { error, attempts }) => format!(
                    "  {} {} {}",
                    "✗".red(),
                    path,
                    format!("{} ({} attempts)", error, attempts).red()
                ),
                None => format!("  {} {}", "•".blue(), path),
            };
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }

    out
}
