//! Console output utilities.

use std::path::PathBuf;

use console::style;

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("OK").green().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Shown when the program is started without inputs.
pub fn print_usage_hint() {
    println!("no arguments were passed, use --help to get help");
}

/// Print configuration summary.
pub fn print_config_summary(inputs: &[String], mode: &str, quality: &str, download_dir: &str) {
    println!();
    println!("{}", style("Configuration:").bold());
    println!("  Inputs: {}", inputs.join(", "));
    println!("  Mode: {}", mode);
    println!("  Quality: {}", quality);
    println!("  Directory: {}", download_dir);
    println!();
}

/// Print where a post was saved.
pub fn print_downloaded(post_id: &str, files: &[PathBuf]) {
    let files: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
    print_success(&format!(
        "Downloaded post {} to {}",
        style(post_id).bold(),
        files.join(", ")
    ));
}
