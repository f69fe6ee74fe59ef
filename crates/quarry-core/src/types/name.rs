//! Project name canonicalization.

use once_cell::sync::Lazy;
use regex::Regex;

static SEPARATOR_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-_.]+").expect("separator pattern is valid"));

/// Canonical form of a project name: lowercase, separator runs collapsed to `-`
pub fn canonicalize_name(name: &str) -> String {
    SEPARATOR_RUNS.replace_all(name.trim(), "-").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_name() {
        assert_eq!(canonicalize_name("Django"), "django");
        assert_eq!(canonicalize_name("zope.interface"), "zope-interface");
        assert_eq!(canonicalize_name("Foo__Bar-.baz"), "foo-bar-baz");
        assert_eq!(canonicalize_name("  requests "), "requests");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let once = canonicalize_name("Ruamel.YAML_clib");
        assert_eq!(canonicalize_name(&once), once);
    }
}
