/// Check if a character is allowed in filenames (whitelist approach)
fn is_valid_filename_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' ')
}

/// Sanitize an episode title for use in a filename.
///
/// Strips every character outside the whitelist, then trims whitespace. May
/// produce an empty string; callers fall back to a synthesized name.
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title.chars().filter(|c| is_valid_filename_char(*c)).collect();
    kept.trim().to_string()
}

/// Generate the on-disk filename for an episode.
///
/// `position` is the 1-based sequence number within the ordered feed. The
/// `{seq:03}_{title}.mp3` layout is a stable contract: the file server that
/// streams completed downloads locates files by it.
pub fn episode_filename(title: Option<&str>, position: usize) -> String {
    let base = title
        .map(sanitize_title)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("Episode_{position}"));

    format!("{position:03}_{base}.mp3")
}
