use clap::{arg, command};
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

fn url_arg() -> clap::Arg {
    arg!(-u --"url" <URL>)
        .required(true)
        .help("Root of the directory listing, e.g. http://host/pub/")
        .value_parser(clap::value_parser!(Url))
}

fn workers_arg() -> clap::Arg {
    arg!(-t --"threads" <NUM_WORKERS>)
        .required(false)
        .help("Maximum number of concurrent requests")
        .value_parser(clap::builder::RangedU64ValueParser::<usize>::new().range(1..))
        .default_value("5")
}

fn pattern_arg() -> clap::Arg {
    arg!(-p --"pattern" <REGEX>)
        .required(false)
        .help("Only keep files whose name matches this regex (anchored at the start)")
}

fn extension_arg() -> clap::Arg {
    arg!(-e --"extension" <EXT>)
        .required(false)
        .help("Only keep files ending with this suffix, e.g. .pdf (repeatable)")
        .action(clap::ArgAction::Append)
}

fn max_depth_arg() -> clap::Arg {
    arg!(--"max-depth" <DEPTH>)
        .required(false)
        .help("Do not descend more than this many folders below the root")
        .value_parser(clap::value_parser!(usize))
}

fn destination_arg() -> clap::Arg {
    arg!(-d --"destination" <DIR>)
        .required(false)
        .help("Directory to mirror files into")
        .default_value("./")
}

fn retries_arg() -> clap::Arg {
    arg!(-r --"retries" <ATTEMPTS>)
        .required(false)
        .help("Attempts per file before giving up")
        .value_parser(clap::value_parser!(u32).range(1..))
        .default_value("5")
}

fn timeout_arg() -> clap::Arg {
    arg!(--"timeout" <SECONDS>)
        .required(false)
        .help("Request timeout in seconds")
        .value_parser(clap::value_parser!(u64).range(1..))
        .default_value("30")
}

fn output_arg() -> clap::Arg {
    arg!(-o --"output" <PATH>)
        .required(false)
        .help("Save report to file (default: display to screen)")
        .value_parser(clap::value_parser!(std::path::PathBuf))
}

fn format_arg() -> clap::Arg {
    arg!(-f --"format" <FORMAT>)
        .required(false)
        .help("Report format: text, json")
        .value_parser(["text", "json"])
        .default_value("text")
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("indexgrab")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("indexgrab")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and progress output").required(false))
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug)")
                .required(false)
                .action(clap::ArgAction::Count),
        )
        .subcommand_required(false)
        .subcommand(
            command!("fetch")
                .about("Crawl a directory listing and download every matching file")
                .arg(url_arg())
                .arg(destination_arg())
                .arg(workers_arg())
                .arg(retries_arg())
                .arg(pattern_arg())
                .arg(extension_arg())
                .arg(
                    arg!(--"stream")
                        .required(false)
                        .help("Start downloading files while the crawl is still running")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(max_depth_arg())
                .arg(timeout_arg())
                .arg(output_arg())
                .arg(format_arg()),
        )
        .subcommand(
            command!("list")
                .about("Crawl a directory listing and report matching files without downloading")
                .arg(url_arg())
                .arg(pattern_arg())
                .arg(extension_arg())
                .arg(workers_arg())
                .arg(max_depth_arg())
                .arg(timeout_arg())
                .arg(output_arg())
                .arg(format_arg()),
        )
        .subcommand(
            command!("download")
                .about("Download a newline-delimited list of file URLs")
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(true)
                        .help("Path to a newline-delimited file of URLs")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(destination_arg())
                .arg(workers_arg())
                .arg(retries_arg())
                .arg(timeout_arg())
                .arg(pattern_arg())
                .arg(extension_arg())
                .arg(output_arg())
                .arg(format_arg()),
        )
}
