//! Statistics reporting.

use console::style;

use crate::download::{GlobalState, ProfileState};

/// Print statistics for a single profile.
pub fn print_profile_stats(state: &ProfileState) {
    println!();
    println!("{}", style(format!("Statistics for {}:", state.user)).bold());
    println!("  Posts:     {} of {} expected", state.posts_seen, state.expected_count);
    println!("  Videos:    {}", state.videos);
    println!("  Galleries: {}", state.galleries);
    println!("  Files:     {}", state.files);
    if !state.failed_posts.is_empty() {
        println!(
            "  Failed:    {} ({})",
            style(state.failed_posts.len()).red(),
            state.failed_posts.join(", ")
        );
    }
}

/// Print statistics across all inputs.
pub fn print_global_stats(state: &GlobalState) {
    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style("Summary:").bold());
    println!("  Inputs processed: {}", state.inputs_processed);
    if state.inputs_failed > 0 {
        println!("  Inputs failed:    {}", style(state.inputs_failed).red());
    }
    println!("  Videos:    {}", state.videos);
    println!("  Galleries: {}", state.galleries);
    println!("  Files:     {}", state.files);
    if state.posts_failed > 0 {
        println!("  Skipped:   {} (failed posts)", style(state.posts_failed).yellow());
    }
    println!("  Total:     {} posts downloaded", state.total_downloaded());
    println!("{}", style("═".repeat(50)).dim());
}
