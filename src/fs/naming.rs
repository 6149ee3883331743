//! Filename generation and manipulation.

use chrono::{TimeZone, Utc};

use crate::api::types::Post;
use crate::error::{Error, Result};
use crate::media::MediaType;

/// Generate the default filename for item `index` of a post.
///
/// `{handle}_{YYYY-MM-DD}_{id}.mp4` for videos and
/// `{handle}_{YYYY-MM-DD}_{id}_{index+1}.jpg` for gallery images. Dates are UTC.
pub fn format_filename(post: &Post, index: usize) -> String {
    let handle = sanitize_path_component(&post.author.unique_id)
        .unwrap_or_else(|_| "unknown".to_string());
    let base = format!("{}_{}_{}", handle, format_date(post.create_time), post.id);

    match post.media_type() {
        MediaType::Video => format!("{}.{}", base, MediaType::Video.extension()),
        MediaType::Image => format!("{}_{}.{}", base, index + 1, MediaType::Image.extension()),
    }
}

/// Filename for item `index` when the caller fixed the name.
///
/// The first item keeps the name as given; later items get `_{index+1}`
/// before the extension so items of one post never overwrite each other.
pub fn indexed_filename(filename: &str, index: usize) -> String {
    if index == 0 {
        return filename.to_string();
    }

    match filename.rfind('.') {
        Some(dot_pos) if dot_pos > 0 => {
            let (name, ext) = filename.split_at(dot_pos);
            format!("{}_{}{}", name, index + 1, ext)
        }
        _ => format!("{}_{}", filename, index + 1),
    }
}

fn format_date(timestamp: i64) -> String {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "0000-00-00".to_string())
}

/// Validate and sanitize a filename by removing or replacing invalid characters.
///
/// Returns an error if the filename contains path traversal patterns.
pub fn sanitize_filename(name: &str) -> Result<String> {
    // Reject path traversal attempts
    if name.contains("..") {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed in filename: '{}'",
            name
        )));
    }

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.trim().is_empty() {
        return Err(Error::InvalidFilename(
            "Filename cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(sanitized)
}

/// Sanitize a single path component such as a user handle.
///
/// Separators are replaced rather than rejected.
pub fn sanitize_path_component(name: &str) -> Result<String> {
    if name.contains("..") {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.trim().is_empty() {
        return Err(Error::InvalidFilename(
            "Path component cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(sanitized)
}
