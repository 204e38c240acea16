use indexgrab::commands::command_argument_builder;
use indexgrab::handlers::*;
use indexgrab::{RunMode, extract_url_path};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://example.com/pub/a.txt").unwrap();
    assert_eq!(result.as_str(), "https://example.com/pub/a.txt");
}

#[test]
fn test_parse_url_line_without_scheme() {
    let result = parse_url_line("example.com/pub/a.txt").unwrap();
    assert_eq!(result.as_str(), "http://example.com/pub/a.txt");
}

#[test]
fn test_parse_url_line_host_and_port() {
    let result = parse_url_line("localhost:8080/a.txt").unwrap();
    assert_eq!(result.as_str(), "http://localhost:8080/a.txt");
}

#[test]
fn test_parse_url_line_invalid() {
    assert_eq!(parse_url_line("not a valid url!!!"), None);
    assert_eq!(parse_url_line("intranet/a.txt"), None);
}

#[test]
fn test_extract_url_path() {
    assert_eq!(extract_url_path("https://example.com/pub/a.txt"), "/pub/a.txt");
    assert_eq!(extract_url_path("https://example.com"), "/");
}

#[test]
fn test_load_urls_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "https://example.com/a.iso")?;
    writeln!(temp_file, "mirror.example.org/b.iso")?;
    writeln!(temp_file)?; // Empty line
    writeln!(temp_file, "# comment")?;
    writeln!(temp_file, "  https://example.com/c.iso  ")?;

    let urls = load_urls_from_file(temp_file.path())?;

    assert_eq!(urls.len(), 3);
    assert_eq!(urls[0].as_str(), "https://example.com/a.iso");
    assert_eq!(urls[1].as_str(), "http://mirror.example.org/b.iso");
    assert_eq!(urls[2].as_str(), "https://example.com/c.iso");

    Ok(())
}

#[test]
fn test_load_urls_from_file_empty() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "   ").unwrap();

    let result = load_urls_from_file(temp_file.path());

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("No valid URLs"));
}

#[test]
fn test_load_urls_from_missing_file() {
    let result = load_urls_from_file(&PathBuf::from("/nonexistent/urls.txt"));
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Failed to read URL list"));
}

#[test]
fn test_expand_destination() {
    assert_eq!(expand_destination("./out"), PathBuf::from("./out"));
    let expanded = expand_destination("~/mirror");
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.ends_with("mirror"));
}

#[test]
fn test_fetch_options_from_args() {
    let matches = command_argument_builder()
        .try_get_matches_from([
            "indexgrab", "fetch", "-u", "http://example.com/pub/", "-d", "/tmp/out", "-t", "3",
            "-r", "2", "-p", "report", "-e", ".pdf", "-e", ".txt", "--stream", "--max-depth", "4",
            "--timeout", "10",
        ])
        .unwrap();
    let (name, args) = matches.subcommand().unwrap();
    assert_eq!(name, "fetch");
    assert!(args.get_flag("stream"));

    let options = build_run_options(args, RunMode::Streaming, true).unwrap();
    assert_eq!(options.destination, PathBuf::from("/tmp/out"));
    assert_eq!(options.workers, 3);
    assert_eq!(options.retry.max_attempts(), 2);
    assert_eq!(options.timeout_secs, 10);
    assert_eq!(options.max_depth, Some(4));
    assert_eq!(options.mode, RunMode::Streaming);
    assert!(!options.show_progress);
    assert!(options.filter.accepts("report-2024.pdf"));
    assert!(options.filter.accepts("report.txt"));
    assert!(!options.filter.accepts("report.doc"));
    assert!(!options.filter.accepts("summary.pdf"));
}

#[test]
fn test_fetch_defaults() {
    let matches = command_argument_builder()
        .try_get_matches_from(["indexgrab", "fetch", "-u", "http://example.com/pub/"])
        .unwrap();
    let (_, args) = matches.subcommand().unwrap();

    let options = build_run_options(args, RunMode::TwoPhase, false).unwrap();
    assert_eq!(options.destination, PathBuf::from("./"));
    assert_eq!(options.workers, 5);
    assert_eq!(options.retry.max_attempts(), 5);
    assert_eq!(options.timeout_secs, 30);
    assert_eq!(options.max_depth, None);
    assert!(options.filter.is_empty());
}

#[test]
fn test_download_subcommand_without_filter() {
    let matches = command_argument_builder()
        .try_get_matches_from(["indexgrab", "download", "-i", "urls.txt", "-f", "json"])
        .unwrap();
    let (name, args) = matches.subcommand().unwrap();
    assert_eq!(name, "download");

    let options = build_run_options(args, RunMode::TwoPhase, true).unwrap();
    assert!(options.filter.is_empty());
}

#[test]
fn test_download_subcommand_accepts_filter() {
    let matches = command_argument_builder()
        .try_get_matches_from([
            "indexgrab", "download", "-i", "urls.txt", "-p", "^linux-", "-e", "iso",
        ])
        .unwrap();
    let (_, args) = matches.subcommand().unwrap();

    let options = build_run_options(args, RunMode::TwoPhase, true).unwrap();
    assert!(options.filter.accepts("linux-6.1.iso"));
    assert!(!options.filter.accepts("linux-6.1.tar.gz"));
    assert!(!options.filter.accepts("bsd-14.iso"));
}

#[test]
fn test_invalid_pattern_is_rejected() {
    let matches = command_argument_builder()
        .try_get_matches_from(["indexgrab", "list", "-u", "http://example.com/", "-p", "(unclosed"])
        .unwrap();
    let (_, args) = matches.subcommand().unwrap();

    let result = build_filter(args);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Invalid --pattern"));
}

#[test]
fn test_zero_workers_rejected() {
    let result = command_argument_builder().try_get_matches_from([
        "indexgrab", "fetch", "-u", "http://example.com/", "-t", "0",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_verbose_count() {
    let matches = command_argument_builder()
        .try_get_matches_from(["indexgrab", "-vv", "-q"])
        .unwrap();
    assert_eq!(matches.get_count("verbose"), 2);
    assert!(matches.get_flag("quiet"));
}
