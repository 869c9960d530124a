use std::path::{Component, Path, PathBuf};

pub fn normalize(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }
    normalized
}

/// Canonical key form for the tag store: absolute, forward-slashed, with
/// `.` and `..` components resolved lexically. Purely syntactic, so paths
/// that no longer exist on disk still canonicalize the same way.
pub fn canonical(path: &str) -> String {
    let normalized = normalize(path);
    let p = Path::new(&normalized);
    let absolute = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(p)
    };

    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }

    normalize(&resolved.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_trailing_slashes() {
        assert_eq!(normalize("/foo/bar/"), "/foo/bar");
        assert_eq!(normalize("/foo/bar///"), "/foo/bar");
        assert_eq!(normalize("/"), "/");
    }

    #[test]
    fn normalize_converts_backslashes() {
        assert_eq!(normalize("C:\\Users\\test"), "C:/Users/test");
    }

    #[test]
    fn canonical_resolves_dot_components() {
        assert_eq!(canonical("/foo/./bar"), "/foo/bar");
        assert_eq!(canonical("/foo/baz/../bar"), "/foo/bar");
    }

    #[test]
    fn canonical_is_stable_across_spellings() {
        assert_eq!(canonical("/foo/bar/"), canonical("/foo/bar"));
        assert_eq!(canonical("/foo//bar/."), canonical("/foo/bar"));
    }

    #[test]
    fn canonical_absolutizes_relative_paths() {
        let cwd = std::env::current_dir().unwrap();
        let expected = canonical(&cwd.join("some_file.txt").to_string_lossy());
        assert_eq!(canonical("some_file.txt"), expected);
    }
}
