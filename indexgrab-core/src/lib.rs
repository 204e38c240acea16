pub mod progress;
pub mod report;
pub mod run;

use colored::Colorize;

pub use progress::ConsoleSink;
pub use report::{ReportFormat, generate_run_report, render_report, write_report};
pub use run::{RunMode, RunOptions, RunReport, execute_download, execute_run, extract_url_path};

pub fn print_banner() {
    let banner = r#"
  _           _                               _
 (_)_ __   __| | _____  ____ _ _ __ __ _| |__
 | | '_ \ / _` |/ _ \ \/ / _` | '__/ _` | '_ \
 | | | | | (_| |  __/>  < (_| | | | (_| | |_) |
 |_|_| |_|\__,_|\___/_/\_\__, |_|  \__,_|_.__/
                         |___/
"#;
    println!("{}", banner.cyan());
    println!(
        "  {} {}\n",
        "mirror open directory listings".bright_black(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
