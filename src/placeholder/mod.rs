//! The reversible placeholder syntax embedded in redacted files.
//!
//! A placeholder always has the exact form `{{NAME}}` where `NAME` matches
//! `[A-Z][A-Z0-9_]*`. This is the one wire format the rest of the tool (and
//! every already-committed dotfiles repo) depends on, so it must stay stable.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Z][A-Z0-9_]*)\}\}").expect("placeholder regex must compile"));

static EXACT_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{\{([A-Z][A-Z0-9_]*)\}\}$").expect("placeholder regex must compile")
});

/// Format a placeholder name as its token form `{{NAME}}`.
pub fn encode(name: &str) -> String {
    format!("{{{{{}}}}}", name)
}

/// Parse a token back into its name.
///
/// Only an exact, well-formed token is accepted; malformed braces, lowercase
/// letters, or stray symbols yield `None` rather than partial recovery.
pub fn decode(token: &str) -> Option<String> {
    EXACT_TOKEN_RE
        .captures(token)
        .map(|caps| caps[1].to_string())
}

/// Find every placeholder name in `content`, de-duplicated, in order of
/// first appearance.
pub fn find_all(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for caps in TOKEN_RE.captures_iter(content) {
        let name = &caps[1];
        if seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    }
    names
}

/// Whether `name` fits the placeholder alphabet exactly.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Coerce arbitrary input into the placeholder alphabet.
///
/// Uppercases letters, maps everything else to `_`, collapses runs of `_`,
/// trims leading/trailing `_`, and prefixes `SECRET_` when the result would
/// start with a digit. Returns `None` when nothing usable remains.
pub fn normalize_name(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut last_underscore = false;
    for c in raw.trim().chars() {
        let mapped = if c.is_ascii_alphanumeric() {
            last_underscore = false;
            c.to_ascii_uppercase()
        } else {
            if last_underscore {
                continue;
            }
            last_underscore = true;
            '_'
        };
        out.push(mapped);
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        return None;
    }

    let name = if trimmed.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("SECRET_{}", trimmed)
    } else {
        trimmed.to_string()
    };

    debug_assert!(is_valid_name(&name));
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode("STRIPE_KEY"), "{{STRIPE_KEY}}");
    }

    #[test]
    fn test_decode_valid() {
        assert_eq!(decode("{{STRIPE_KEY}}"), Some("STRIPE_KEY".to_string()));
        assert_eq!(decode("{{A}}"), Some("A".to_string()));
        assert_eq!(decode("{{A1_B2}}"), Some("A1_B2".to_string()));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(decode("{{stripe_key}}"), None);
        assert_eq!(decode("{{1KEY}}"), None);
        assert_eq!(decode("{{KEY}"), None);
        assert_eq!(decode("{KEY}"), None);
        assert_eq!(decode("{{KE-Y}}"), None);
        assert_eq!(decode(" {{KEY}}"), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn test_find_all_dedup_first_appearance() {
        let content = "a={{B_TOKEN}}\nb={{A_TOKEN}}\nc={{B_TOKEN}}\n";
        assert_eq!(find_all(content), vec!["B_TOKEN", "A_TOKEN"]);
    }

    #[test]
    fn test_find_all_ignores_invalid_tokens() {
        let content = "{{lower}} {{9BAD}} {{OK_1}}";
        assert_eq!(find_all(content), vec!["OK_1"]);
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("API_KEY"));
        assert!(is_valid_name("A"));
        assert!(is_valid_name("A1_2B"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("api_key"));
        assert!(!is_valid_name("1KEY"));
        assert!(!is_valid_name("_KEY"));
        assert!(!is_valid_name("KE Y"));
    }

    #[test]
    fn test_normalize_lowercase() {
        assert_eq!(normalize_name("stripe key"), Some("STRIPE_KEY".to_string()));
    }

    #[test]
    fn test_normalize_collapses_runs() {
        assert_eq!(
            normalize_name("my--weird..name"),
            Some("MY_WEIRD_NAME".to_string())
        );
    }

    #[test]
    fn test_normalize_trims_and_prefixes_digit() {
        assert_eq!(normalize_name("_key_"), Some("KEY".to_string()));
        assert_eq!(normalize_name("1password"), Some("SECRET_1PASSWORD".to_string()));
    }

    #[test]
    fn test_normalize_nothing_usable() {
        assert_eq!(normalize_name("---"), None);
        assert_eq!(normalize_name(""), None);
        assert_eq!(normalize_name("   "), None);
    }

    #[test]
    fn test_normalized_names_are_valid() {
        for raw in ["foo bar", "x", "9lives", "a-b-c", "ALREADY_GOOD"] {
            let name = normalize_name(raw).unwrap();
            assert!(is_valid_name(&name), "{:?} -> {:?}", raw, name);
        }
    }
}
