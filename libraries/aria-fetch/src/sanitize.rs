/// Characters that cannot appear in filenames on common filesystems
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Derive a filesystem-safe filename stem from a track title.
///
/// Strips filesystem-illegal characters and control characters, then trims
/// whitespace. Deterministic; repeated titles are not deduplicated, so a
/// collision overwrites the earlier file.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}
