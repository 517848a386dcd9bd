use std::path::PathBuf;

use dirs_next::home_dir;

/// Expands a leading `~` to the home directory; other paths are returned trimmed.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    let home = || home_dir().unwrap_or_else(|| PathBuf::from("~"));

    if trimmed == "~" {
        return home();
    }
    match trimmed.strip_prefix("~/").or_else(|| trimmed.strip_prefix("~\\")) {
        Some(rest) => home().join(rest),
        None => PathBuf::from(trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_plain_paths_alone() {
        assert_eq!(expand_tilde(" /srv/assets "), PathBuf::from("/srv/assets"));
        assert_eq!(expand_tilde("assets/~x"), PathBuf::from("assets/~x"));
    }

    #[test]
    fn expands_home_prefix() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_tilde("~"), home);
            assert_eq!(expand_tilde("~/tasks"), home.join("tasks"));
        }
    }
}
