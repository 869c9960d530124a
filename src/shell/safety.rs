use crate::error::AppError;
use std::path::{Component, Path};

const FORBIDDEN_PATTERNS: &[&str] = &[";", "&&", "||", "|", "`", "$(", "${", "\n", "\r"];

pub fn validate_path(path: &str) -> Result<(), AppError> {
    if path.is_empty() {
        return Err(AppError::General("path is empty".to_string()));
    }

    for pattern in FORBIDDEN_PATTERNS {
        if path.contains(pattern) {
            return Err(AppError::General(format!(
                "path contains forbidden pattern: {pattern}"
            )));
        }
    }

    let p = Path::new(path);
    for component in p.components() {
        if let Component::Normal(s) = component {
            let s = s.to_string_lossy();
            if s == ".." {
                return Err(AppError::General(
                    "path traversal (.. component) not allowed".to_string(),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert!(validate_path("/Users/test/file.txt").is_ok());
        assert!(validate_path("/tmp/folder").is_ok());
        assert!(validate_path("/home/user/docs/report.pdf").is_ok());
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(validate_path("").is_err());
    }

    #[test]
    fn test_injection_patterns_rejected() {
        assert!(validate_path("/tmp/file; rm -rf /").is_err());
        assert!(validate_path("/tmp/$(whoami)").is_err());
        assert!(validate_path("/tmp/file && cat /etc/passwd").is_err());
        assert!(validate_path("/tmp/file | grep secret").is_err());
        assert!(validate_path("/tmp/`id`").is_err());
        assert!(validate_path("/tmp/file\n/etc/passwd").is_err());
    }
}
