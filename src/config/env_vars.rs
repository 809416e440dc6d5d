use std::env;
use std::path::PathBuf;

use regex::{Captures, Regex};

/// Substitute `${VAR}` and `$VAR` references with their environment values.
///
/// References to unset variables are left untouched.
pub fn parse_unix_env_vars(path: &str) -> String {
    if !path.contains('$') {
        return path.to_string();
    }

    let Ok(pattern) = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)") else {
        return path.to_string();
    };

    pattern
        .replace_all(path, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// The current user's home directory, from `HOME` or `USERPROFILE`.
pub fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

/// Replace a leading `~` (alone or followed by a separator) with the home directory.
pub fn expand_home(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => return path.to_string(),
    };

    match home_dir() {
        Some(home) => format!("{}{}", home.display(), rest),
        None => path.to_string(),
    }
}

/// Environment substitution followed by home expansion.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(expand_home(&parse_unix_env_vars(path)))
}
