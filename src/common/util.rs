use std::path::Path;

/// Characters that are not allowed in file names on at least one common
/// platform.
const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Make `name` usable as a single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if RESERVED.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    // Leading dots would hide the file or form "." / ".."
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `"<artist> - <title>.<ext>"`, keeping the source file's extension.
pub fn artist_title_file_name(artist: &str, title: &str, source: &Path) -> String {
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp3".to_string());
    format!("{}.{}", sanitize_file_name(&format!("{} - {}", artist, title)), ext)
}

/// Whether a caller-supplied string counts as "no value".
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
