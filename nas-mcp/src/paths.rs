//! Lexical path normalization and the fixed browsing root
//!
//! Normalization never touches the filesystem: it collapses `.`, `..` and
//! repeated separators the same way `normpath` does on POSIX, so a path that
//! does not exist on this host can still be checked before it is sent to the
//! NAS.

use thiserror::Error;

/// Every filesystem operation is confined to this mount root.
pub const MOUNT_ROOT: &str = "/mnt";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Path must be under {root}/ (got '{path}')")]
pub struct OutsideRoot {
    pub root: &'static str,
    pub path: String,
}

/// Collapse `.`/`..` segments and redundant separators.
///
/// Absolute paths cannot climb above `/`; relative paths keep any leading
/// `..` segments. An empty result becomes `.`. Exactly two leading slashes
/// are kept as `//` (POSIX leaves their meaning implementation-defined);
/// three or more fold to one.
pub fn normalize(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let absolute = path.starts_with('/');
    let root = if path.starts_with("//") && !path.starts_with("///") {
        "//"
    } else {
        "/"
    };
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("{root}{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// True when `normalized` is `root` itself or lies below it.
pub fn is_within(normalized: &str, root: &str) -> bool {
    normalized == root
        || normalized
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Normalize `path` and make sure it stays under [`MOUNT_ROOT`].
pub fn restrict_to_mount_root(path: &str) -> Result<String, OutsideRoot> {
    let normalized = normalize(path);
    if is_within(&normalized, MOUNT_ROOT) {
        Ok(normalized)
    } else {
        tracing::warn!(path = %path, normalized = %normalized, "Rejected path outside mount root");
        Err(OutsideRoot {
            root: MOUNT_ROOT,
            path: path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_dots_and_separators() {
        assert_eq!(normalize("/mnt//pool/./data/"), "/mnt/pool/data");
        assert_eq!(normalize("/mnt/pool/../etc/passwd"), "/mnt/etc/passwd");
        assert_eq!(normalize("/../../etc"), "/etc");
        assert_eq!(normalize("/"), "/");
    }

    #[test]
    fn test_normalize_double_leading_slash() {
        assert_eq!(normalize("//mnt/x"), "//mnt/x");
        assert_eq!(normalize("//mnt/../x"), "//x");
        assert_eq!(normalize("///mnt/x"), "/mnt/x");
        assert_eq!(normalize("//"), "//");
        assert!(restrict_to_mount_root("//mnt/Store").is_err());
    }

    #[test]
    fn test_normalize_relative_paths() {
        assert_eq!(normalize("./data"), "data");
        assert_eq!(normalize("../data"), "../data");
        assert_eq!(normalize("a/../.."), "..");
        assert_eq!(normalize(""), ".");
        assert_eq!(normalize("a/.."), ".");
    }

    #[test]
    fn test_is_within_requires_separator_boundary() {
        assert!(is_within("/mnt", "/mnt"));
        assert!(is_within("/mnt/Store", "/mnt"));
        assert!(!is_within("/mnt2/Store", "/mnt"));
        assert!(!is_within("/etc", "/mnt"));
    }

    #[test]
    fn test_restrict_to_mount_root() {
        assert_eq!(restrict_to_mount_root("/mnt/Store/").unwrap(), "/mnt/Store");
        assert_eq!(restrict_to_mount_root("/mnt").unwrap(), "/mnt");

        let err = restrict_to_mount_root("/mnt/../../etc").unwrap_err();
        assert!(err.to_string().contains("must be under /mnt/"));
        assert!(restrict_to_mount_root("/etc").is_err());
        assert!(restrict_to_mount_root("mnt/Store").is_err());
    }
}
