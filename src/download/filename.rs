//! Filename sanitization and destination naming for episode downloads.
//!
//! Every user-visible name component passes through [`sanitize`] before it is
//! used in a destination path or an external link title.

use std::fmt::Display;
use std::path::{Component, Path, PathBuf};

use crate::encoding::encode_uri_component;

/// Characters that are invalid in filenames on common filesystems.
const ILLEGAL_FILENAME_CHARS: [char; 9] = ['\\', '/', '<', '>', '*', '?', ':', '"', '|'];

/// Replaces every filesystem-illegal character (`\ / < > * ? : " |`) with `_`.
///
/// Total and idempotent: `sanitize(&sanitize(s)) == sanitize(s)` for every `s`.
///
/// ```
/// use episode_dl::download::sanitize;
///
/// assert_eq!(sanitize("Re:Zero / Part 2"), "Re_Zero _ Part 2");
/// ```
#[must_use]
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if ILLEGAL_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Builds the episode title: `<sanitizedName> - E<sanitizedNumber> (<quality>)`.
#[must_use]
pub fn episode_title(name: &str, number: impl Display, quality: &str) -> String {
    format!(
        "{} - E{} ({quality})",
        sanitize(name),
        sanitize(&number.to_string())
    )
}

/// Builds the local destination identifier:
/// `<container>/<sanitizedName> - E<number> (<quality>).<fileType>`.
///
/// The file type comes from upstream and is sanitized like the name.
#[must_use]
pub fn destination_filename(
    container: &str,
    name: &str,
    number: impl Display,
    quality: &str,
    file_type: &str,
) -> String {
    format!(
        "{container}/{}.{}",
        episode_title(name, number, quality),
        sanitize(file_type)
    )
}

/// Appends the encoded episode title to a file URL for external download managers.
///
/// The title is appended literally as `&title=...`, matching what external
/// managers expect from grabber URLs (which always carry a query string).
#[must_use]
pub fn external_link(file_url: &str, name: &str, number: impl Display, quality: &str) -> String {
    let title = encode_uri_component(&episode_title(name, number, quality));
    format!("{file_url}&title={title}")
}

/// Maps a destination identifier to a path under `root`.
///
/// Root, prefix, `.` and `..` components are dropped so the result never
/// escapes `root`.
pub(crate) fn destination_path(root: &Path, destination: &str) -> PathBuf {
    let relative: PathBuf = Path::new(destination)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    if relative.as_os_str().is_empty() {
        root.join("download.bin")
    } else {
        root.join(relative)
    }
}

/// Resolves a destination path under `root`, uniquifying on conflict.
///
/// Mirrors browser download managers: `file.mp4`, then `file (1).mp4`,
/// `file (2).mp4`, ... A path is taken when it exists on disk or `is_claimed`
/// says another pending download already owns it.
pub(crate) fn resolve_unique_path(
    root: &Path,
    destination: &str,
    is_claimed: impl Fn(&Path) -> bool,
) -> PathBuf {
    let taken = |path: &Path| path.exists() || is_claimed(path);
    let candidate = destination_path(root, destination);

    if !taken(&candidate) {
        return candidate;
    }

    let parent = candidate.parent().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
    let stem = candidate
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = candidate
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for i in 1..1000 {
        let path = parent.join(format!("{stem} ({i}){ext}"));
        if !taken(&path) {
            return path;
        }
    }

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    parent.join(format!("{stem} ({timestamp}){ext}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_replaces_each_illegal_char() {
        for c in ILLEGAL_FILENAME_CHARS {
            assert_eq!(sanitize(&format!("a{c}b")), "a_b", "char {c:?} should be replaced");
        }
    }

    #[test]
    fn test_sanitize_preserves_other_chars() {
        assert_eq!(sanitize("Shingeki no Kyojin (TV)"), "Shingeki no Kyojin (TV)");
        assert_eq!(sanitize("進撃の巨人"), "進撃の巨人");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let samples = [
            "",
            "plain",
            r#"\/<>*?:"|"#,
            "Re:Zero kara Hajimeru Isekai Seikatsu",
            "a/b\\c<d>e*f?g:h\"i|j",
            "___",
            "mixed 日本 / ünïcödé ?",
        ];
        for s in samples {
            let once = sanitize(s);
            assert_eq!(sanitize(&once), once, "sanitize not idempotent for {s:?}");
            assert!(
                !once.chars().any(|c| ILLEGAL_FILENAME_CHARS.contains(&c)),
                "illegal char left in {once:?}"
            );
        }
    }

    #[test]
    fn test_episode_title_format() {
        assert_eq!(episode_title("Name", 1, "720p"), "Name - E1 (720p)");
        assert_eq!(episode_title("A/B", "12.5", "1080p"), "A_B - E12.5 (1080p)");
    }

    #[test]
    fn test_destination_filename_format() {
        assert_eq!(
            destination_filename("9anime Companion", "Shingeki: No Kyojin", 5, "1080p", "mp4"),
            "9anime Companion/Shingeki_ No Kyojin - E5 (1080p).mp4"
        );
    }

    #[test]
    fn test_destination_filename_sanitizes_number_and_type() {
        assert_eq!(
            destination_filename("Box", "Show", "1/2", "720p", "mp4?x=1"),
            "Box/Show - E1_2 (720p).mp4_x=1"
        );
    }

    #[test]
    fn test_external_link_matches_browser_encoding() {
        assert_eq!(
            external_link("http://x/b.mp4", "Name", 1, "720p"),
            "http://x/b.mp4&title=Name%20-%20E1%20(720p)"
        );
    }

    #[test]
    fn test_external_link_sanitizes_before_encoding() {
        assert_eq!(
            external_link("http://x/b.mp4?k=1", "A?B", 2, "360p"),
            "http://x/b.mp4?k=1&title=A_B%20-%20E2%20(360p)"
        );
    }

    #[test]
    fn test_resolve_unique_path_no_conflict() {
        let temp = TempDir::new().unwrap();
        let path = resolve_unique_path(temp.path(), "Box/Show - E1 (720p).mp4", |_| false);
        assert_eq!(path, temp.path().join("Box").join("Show - E1 (720p).mp4"));
    }

    #[test]
    fn test_resolve_unique_path_uniquifies() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Show.mp4"), b"x").unwrap();
        let path = resolve_unique_path(temp.path(), "Show.mp4", |_| false);
        assert_eq!(path, temp.path().join("Show (1).mp4"));

        std::fs::write(&path, b"y").unwrap();
        let path = resolve_unique_path(temp.path(), "Show.mp4", |_| false);
        assert_eq!(path, temp.path().join("Show (2).mp4"));
    }

    #[test]
    fn test_resolve_unique_path_skips_claimed_names() {
        let temp = TempDir::new().unwrap();
        let claimed = [
            temp.path().join("Box").join("Show.mp4"),
            temp.path().join("Box").join("Show (1).mp4"),
        ];
        let path = resolve_unique_path(temp.path(), "Box/Show.mp4", |p| claimed.iter().any(|c| c == p));
        assert_eq!(path, temp.path().join("Box").join("Show (2).mp4"));
    }

    #[test]
    fn test_destination_path_strips_absolute_prefix() {
        let temp = TempDir::new().unwrap();
        let path = destination_path(temp.path(), "/abs/Box/Show.mp4");
        assert_eq!(path, temp.path().join("abs").join("Box").join("Show.mp4"));
    }

    #[test]
    fn test_resolve_unique_path_drops_traversal_components() {
        let temp = TempDir::new().unwrap();
        let path = resolve_unique_path(temp.path(), "../../etc/passwd", |_| false);
        assert!(path.starts_with(temp.path()));
        assert_eq!(path, temp.path().join("etc").join("passwd"));
    }

    #[test]
    fn test_resolve_unique_path_empty_falls_back() {
        let temp = TempDir::new().unwrap();
        let path = resolve_unique_path(temp.path(), "..", |_| false);
        assert_eq!(path, temp.path().join("download.bin"));
    }
}
