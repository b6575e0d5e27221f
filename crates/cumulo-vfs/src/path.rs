//! Virtual path normalization and helpers.
//!
//! One normalization routine is shared by the mount table, the cache, and
//! every manager entry point, so the same file can never live under two
//! different keys.

/// Normalize a virtual path.
///
/// - backslashes become forward slashes
/// - runs of slashes collapse to one
/// - `.` segments drop, `..` segments pop (clamped at root)
/// - trailing slash is stripped, except on the root itself
/// - result always has a single leading `/`
///
/// Idempotent: `normalize(normalize(p)) == normalize(p)`.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        "/".to_string()
    } else {
        let mut out = String::with_capacity(path.len());
        for s in &segments {
            out.push('/');
            out.push_str(s);
        }
        out
    }
}

/// Join a normalized directory path and a child name.
pub fn join(base: &str, name: &str) -> String {
    if base == "/" {
        format!("/{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Parent of a normalized path; `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&path[..i]),
        None => None,
    }
}

/// Final component of a normalized path; `/` for the root.
pub fn file_name(path: &str) -> &str {
    if path == "/" {
        return "/";
    }
    path.rsplit('/').next().unwrap_or(path)
}

/// True when `path` equals `prefix` or sits underneath it.
///
/// Both arguments must be normalized. Pure string prefixing is not enough:
/// `/data2` is not under `/data`.
pub fn is_under(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

/// Strip a mount prefix, yielding the adapter-relative path (`/` if empty).
///
/// Caller must have checked `is_under(path, prefix)` first.
pub fn strip_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    if prefix == "/" {
        return path;
    }
    match path.strip_prefix(prefix) {
        Some("") | None => "/",
        Some(rest) => rest,
    }
}

/// Path components of a normalized path, root excluded.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::plain("/a/b", "/a/b")]
    #[case::backslashes("\\a\\b", "/a/b")]
    #[case::repeated_slashes("//a///b", "/a/b")]
    #[case::trailing_slash("/a/b/", "/a/b")]
    #[case::root("/", "/")]
    #[case::root_slashes("///", "/")]
    #[case::empty("", "/")]
    #[case::missing_leading("a/b", "/a/b")]
    #[case::dot_segments("/a/./b", "/a/b")]
    #[case::dotdot("/a/b/../c", "/a/c")]
    #[case::dotdot_past_root("/../../a", "/a")]
    #[case::mixed("\\\\data//docs\\..//notes/", "/data/notes")]
    fn normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(p in "[a-z./\\\\]{0,40}") {
            let once = normalize(&p);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalized_has_leading_slash(p in "[a-z./\\\\]{0,40}") {
            prop_assert!(normalize(&p).starts_with('/'));
        }
    }

    #[test]
    fn join_and_parent_are_inverse() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
        assert_eq!(parent("/a/b"), Some("/a"));
        assert_eq!(parent("/a"), Some("/"));
        assert_eq!(parent("/"), None);
    }

    #[test]
    fn file_name_of_root_is_slash() {
        assert_eq!(file_name("/"), "/");
        assert_eq!(file_name("/a/b.txt"), "b.txt");
    }

    #[test]
    fn is_under_rejects_sibling_prefixes() {
        assert!(is_under("/data/x", "/data"));
        assert!(is_under("/data", "/data"));
        assert!(!is_under("/data2/x", "/data"));
        assert!(is_under("/anything", "/"));
    }

    #[test]
    fn strip_prefix_yields_adapter_relative() {
        assert_eq!(strip_prefix("/data/x", "/data"), "/x");
        assert_eq!(strip_prefix("/data", "/data"), "/");
        assert_eq!(strip_prefix("/x", "/"), "/x");
    }
}
