//! Filesystem-path normalization shared by the patchers.

/// Normalize a path the way the game's filesystem does: backslashes become
/// forward slashes, case is folded, and a leading slash is dropped.
#[must_use]
pub fn convert_fs_path(path: &str) -> String {
    let lower = path.replace('\\', "/").to_lowercase();
    lower.strip_prefix('/').map_or_else(|| lower.clone(), str::to_string)
}

/// Substitute for `COM_StripExtension`: drop everything from the last `.`
/// in the final path segment onward.
#[must_use]
pub fn strip_ext(name: &str) -> String {
    let segment_start = name.rfind('/').map_or(0, |i| i + 1);
    match name[segment_start..].rfind('.') {
        Some(dot) => name[..segment_start + dot].to_string(),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn converts_backslashes_and_case_and_leading_slash() {
        assert_eq!(convert_fs_path(r"\Music\Track.wav"), "music/track.wav");
        assert_eq!(convert_fs_path("Music/Track.wav"), "music/track.wav");
    }

    #[test]
    fn strips_trailing_extension_only() {
        assert_eq!(strip_ext("music/track.wav"), "music/track");
        assert_eq!(strip_ext("music/track"), "music/track");
    }
}
