//! Filename extraction, sanitization, and temporary-file naming.
//!
//! The engine needs a filename for exactly one purpose: naming the private
//! temporary file that receives the body before it is committed to the
//! user-chosen destination.

use std::path::{Component, Path};

use url::Url;

use super::constants::TEMP_MARKER;
use super::task::TaskId;

/// Parses Content-Disposition header to extract filename.
///
/// Handles both:
/// - `attachment; filename="example.iso"`
/// - `attachment; filename=example.iso`
/// - `attachment; filename*=UTF-8''example.iso` (RFC 5987)
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    // Try filename*= first (RFC 5987 encoded)
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + 10..].trim();
        // Format: charset'language'encoded_value
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            let encoded_name = encoded[..end].trim().trim_matches('"');
            if let Ok(decoded) = urlencoding::decode(encoded_name)
                && !decoded.is_empty()
            {
                return Some(decoded.into_owned());
            }
        }
    }

    let pos = header.find("filename=")?;
    let value = header[pos + 9..].trim();

    if let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let stripped = &value[1..];
        let end = stripped.find(quote).unwrap_or(stripped.len());
        let filename = stripped[..end].trim();
        return (!filename.is_empty()).then(|| filename.to_string());
    }

    // Unquoted - take until ; or end
    let end = value.find(';').unwrap_or(value.len());
    let filename = value[..end].trim();
    (!filename.is_empty()).then(|| filename.to_string())
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Picks the name used for the temporary file.
///
/// Priority: server-provided filename, destination basename, last URL path
/// segment, then `download_<unix-seconds>`.
pub(crate) fn resolve_filename(
    server_filename: Option<&str>,
    destination: &Path,
    url: &str,
) -> String {
    if let Some(name) = server_filename.filter(|name| !name.trim().is_empty()) {
        return sanitize_filename(name);
    }

    if let Some(name) = destination.file_name().and_then(|n| n.to_str())
        && !name.is_empty()
    {
        return sanitize_filename(name);
    }

    if let Ok(parsed) = Url::parse(url)
        && let Some(mut segments) = parsed.path_segments()
        && let Some(last) = segments.next_back()
        && !last.is_empty()
    {
        let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), |d| d.into_owned());
        return sanitize_filename(&decoded);
    }

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("download_{timestamp}")
}

/// Filename a destination defaults to when only a URL is known.
///
/// Uses the percent-decoded last path segment, else `download_<unix-seconds>`.
#[must_use]
pub fn default_destination_name(url: &str) -> String {
    resolve_filename(None, Path::new(""), url)
}

/// `name` with `-<n>` inserted before its extension: `report.pdf` → `report-2.pdf`.
#[must_use]
pub fn numbered_name(name: &str, n: usize) -> String {
    let (stem, ext) = split_extension(name);
    format!("{stem}-{n}{ext}")
}

/// Builds the temporary filename: `<stem>-<task>.litefetch_tmp<ext>`.
///
/// The extension is preserved so tools inspecting the temp directory still
/// recognise the file type; the task id keeps concurrent tasks that resolve
/// to the same filename apart.
pub(crate) fn temp_file_name(filename: &str, task_id: TaskId) -> String {
    let (stem, ext) = split_extension(filename);
    format!("{stem}-{}{TEMP_MARKER}{ext}", task_id.get())
}

/// Splits `name` into stem and extension (extension keeps its dot).
///
/// Leading dots never start an extension, so `.bashrc` has none.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if !name[..pos].chars().all(|c| c == '.') => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}
