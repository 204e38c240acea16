pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{build_filter, expand_destination, load_urls_from_file, parse_url_line};

pub use indexgrab_core::run::{RunMode, RunOptions, RunReport, extract_url_path};
