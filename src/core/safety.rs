// read-only sql gate
// no parser here: a prefix check plus a keyword denylist.
// matching is plain substring on purpose, so `update_log` or a literal
// like 'created' gets blocked too. we'd rather over-block than let a
// mutation through.

use std::fmt;

use super::normalize::normalize;

/// Keyword denylist with what each one can do to the database.
/// Checked in order, first hit decides the reason.
pub const FORBIDDEN_KEYWORDS: &[(&str, &str)] = &[
    // schema
    ("drop", "drop can permanently delete tables"),
    ("alter", "alter modifies table structure"),
    ("create", "create adds tables, indexes or triggers"),
    ("truncate", "truncate deletes all data"),
    // data
    ("delete", "delete removes rows"),
    ("insert", "insert writes rows"),
    ("update", "update rewrites rows"),
    ("replace", "replace overwrites rows"),
    // engine
    ("attach", "attach opens another database file"),
    ("detach", "detach closes an attached database"),
    ("pragma", "pragma changes engine settings"),
];

const READ_KEYWORD: &str = "select";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotReadQuery,
    ForbiddenKeyword(&'static str),
}

impl DenyReason {
    pub fn code(&self) -> String {
        match self {
            Self::NotReadQuery => "not-a-read-query".to_string(),
            Self::ForbiddenKeyword(kw) => format!("forbidden-keyword:{kw}"),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::NotReadQuery => "only select queries are allowed",
            Self::ForbiddenKeyword(kw) => FORBIDDEN_KEYWORDS
                .iter()
                .find(|(k, _)| k == kw)
                .map(|(_, why)| *why)
                .unwrap_or("forbidden keyword"),
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed(String),
    Denied { statement: String, reason: DenyReason },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    pub fn statement(&self) -> &str {
        match self {
            Self::Allowed(s) | Self::Denied { statement: s, .. } => s,
        }
    }

    pub fn reason(&self) -> Option<DenyReason> {
        match self {
            Self::Allowed(_) => None,
            Self::Denied { reason, .. } => Some(*reason),
        }
    }
}

pub struct Safety;

impl Safety {
    /// Classifies an already normalized statement.
    ///
    /// Both layers have to pass. The keyword scan runs first so a leading
    /// mutating verb reports the keyword rather than the generic reason.
    pub fn classify(statement: &str) -> Verdict {
        let lowered = statement.trim().to_lowercase();

        let denied = |reason| Verdict::Denied {
            statement: statement.to_string(),
            reason,
        };

        if let Some((kw, _)) = FORBIDDEN_KEYWORDS
            .iter()
            .find(|(kw, _)| lowered.contains(kw))
        {
            return denied(DenyReason::ForbiddenKeyword(*kw));
        }

        if !lowered.starts_with(READ_KEYWORD) {
            return denied(DenyReason::NotReadQuery);
        }

        // TODO: decide whether chained selects should be denied outright
        if is_chained(&lowered) {
            tracing::warn!(statement, "allowing chained read-only statements");
        }

        Verdict::Allowed(statement.to_string())
    }

    /// Normalizes a raw generation and classifies it.
    pub fn check(raw: &str) -> Verdict {
        Self::classify(&normalize(raw))
    }
}

// more than one statement, ignoring a trailing semicolon
fn is_chained(lowered: &str) -> bool {
    lowered
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
        .contains(';')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_semicolon_is_not_chaining() {
        assert!(!is_chained("select 1;"));
        assert!(!is_chained("select 1 ;  "));
        assert!(is_chained("select 1; select 2"));
    }

    #[test]
    fn every_keyword_has_a_description() {
        for (kw, why) in FORBIDDEN_KEYWORDS {
            assert_eq!(DenyReason::ForbiddenKeyword(*kw).description(), *why);
        }
    }

    #[test]
    fn keywords_are_lowercase() {
        for (kw, _) in FORBIDDEN_KEYWORDS {
            assert_eq!(*kw, kw.to_lowercase());
        }
    }
}
