//! Error-code hints
//!
//! Maps store error codes to advice for whoever reads the probe result. Rules
//! are checked top to bottom and the first match wins; matching ignores case.

/// How a hint should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintKind {
    /// Something the operator should fix
    Action,
    /// Informational, nothing is wrong
    Notice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hint {
    pub kind: HintKind,
    pub text: &'static str,
}

#[derive(Debug, Clone, Copy)]
enum Match {
    Exact,
    Contains,
}

struct HintRule {
    pattern: &'static str,
    matching: Match,
    hint: Hint,
}

pub const API_KEY_HINT: &str =
    "Check the API key in the probe configuration; it was rejected as invalid";
pub const DUPLICATE_APP_HINT: &str =
    "A connection with this app name is already initialized; this is informational and not fatal";
pub const PERMISSION_HINT: &str =
    "Check the database access rules allow reading the permission path and writing the diagnostic path";
pub const URL_HINT: &str = "Check the database URL; it must be an http(s) URL with a host";
pub const NETWORK_HINT: &str =
    "Check network connectivity and that the database URL is reachable from this host";

const fn action(text: &'static str) -> Hint {
    Hint {
        kind: HintKind::Action,
        text,
    }
}

const HINT_TABLE: &[HintRule] = &[
    HintRule {
        pattern: "auth/api-key-not-valid",
        matching: Match::Exact,
        hint: action(API_KEY_HINT),
    },
    HintRule {
        pattern: "auth/invalid-api-key",
        matching: Match::Exact,
        hint: action(API_KEY_HINT),
    },
    HintRule {
        pattern: "app/duplicate-app",
        matching: Match::Exact,
        hint: Hint {
            kind: HintKind::Notice,
            text: DUPLICATE_APP_HINT,
        },
    },
    HintRule {
        pattern: "permission_denied",
        matching: Match::Contains,
        hint: action(PERMISSION_HINT),
    },
    HintRule {
        pattern: "permission-denied",
        matching: Match::Contains,
        hint: action(PERMISSION_HINT),
    },
    HintRule {
        pattern: "database/invalid-url",
        matching: Match::Exact,
        hint: action(URL_HINT),
    },
    HintRule {
        pattern: "network/timeout",
        matching: Match::Exact,
        hint: action(NETWORK_HINT),
    },
    HintRule {
        pattern: "network/unreachable",
        matching: Match::Exact,
        hint: action(NETWORK_HINT),
    },
];

/// Hint for `code`, if the table has one
pub fn lookup(code: &str) -> Option<Hint> {
    let code = code.to_lowercase();
    HINT_TABLE
        .iter()
        .find(|rule| match rule.matching {
            Match::Exact => code == rule.pattern,
            Match::Contains => code.contains(rule.pattern),
        })
        .map(|rule| rule.hint)
}

/// Split a lookup into `(recommendation, notice)`
pub fn split(code: &str) -> (Option<String>, Option<String>) {
    match lookup(code) {
        Some(Hint {
            kind: HintKind::Action,
            text,
        }) => (Some(text.to_string()), None),
        Some(Hint {
            kind: HintKind::Notice,
            text,
        }) => (None, Some(text.to_string())),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_codes() {
        for code in ["auth/api-key-not-valid", "auth/invalid-api-key", "AUTH/API-KEY-NOT-VALID"] {
            let hint = lookup(code).unwrap();
            assert_eq!(hint.kind, HintKind::Action);
            assert!(hint.text.contains("API key"), "{code}");
        }
    }

    #[test]
    fn test_duplicate_app_is_a_notice() {
        let (recommendation, notice) = split("app/duplicate-app");
        assert_eq!(recommendation, None);
        assert_eq!(notice.as_deref(), Some(DUPLICATE_APP_HINT));
    }

    #[test]
    fn test_permission_substring() {
        assert_eq!(lookup("PERMISSION_DENIED").unwrap().text, PERMISSION_HINT);
        assert_eq!(
            lookup("database/permission-denied").unwrap().text,
            PERMISSION_HINT
        );
    }

    #[test]
    fn test_unknown_code_has_no_hint() {
        assert_eq!(lookup("database/http-500"), None);
        assert_eq!(split(""), (None, None));
    }
}
