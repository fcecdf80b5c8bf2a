//! File utility functions

use std::path::PathBuf;

/// Resolve a user-supplied path (e.g. `--config ~/zentry.json`) to an absolute path.
///
/// `~` and `~/...` expand to the home directory; relative paths are joined
/// onto the current directory without being canonicalized.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let expanded = match path.strip_prefix('~') {
        Some("") => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        Some(rest) if rest.starts_with('/') || rest.starts_with('\\') => dirs::home_dir()
            .map(|home| home.join(&rest[1..]))
            .unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path_unchanged() {
        assert_eq!(
            expand_path("/etc/zentry/zentry.json"),
            PathBuf::from("/etc/zentry/zentry.json")
        );
    }

    #[test]
    fn test_relative_config_path() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path("./zentry.json"), cwd.join("./zentry.json"));
        assert_eq!(expand_path("conf/zentry.json"), cwd.join("conf/zentry.json"));
    }

    #[test]
    fn test_tilde_expands_to_home() {
        let result = expand_path("~/.zentry/zentry.json");
        assert!(result.is_absolute());
        assert!(!result.to_string_lossy().contains('~'));
        assert!(result.ends_with(".zentry/zentry.json"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~"), home);
        }
    }

    #[test]
    fn test_tilde_inside_name_is_literal() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path("~backup.json"), cwd.join("~backup.json"));
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(
            expand_path("  /tmp/zentry.json  "),
            PathBuf::from("/tmp/zentry.json")
        );
        assert!(expand_path("   ").is_absolute());
    }
}
