use colored::Colorize;
use indexgrab::commands::command_argument_builder;
use indexgrab::handlers::{
    EXIT_FATAL, handle_download, handle_fetch, handle_list, init_logging,
};
use indexgrab_core::print_banner;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    init_logging(chosen_command.get_count("verbose"));

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    let result = match chosen_command.subcommand() {
        Some(("fetch", primary_command)) => handle_fetch(primary_command, quiet).await,
        Some(("list", primary_command)) => handle_list(primary_command, quiet).await,
        Some(("download", primary_command)) => handle_download(primary_command, quiet).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(EXIT_FATAL);
        }
    }
}
