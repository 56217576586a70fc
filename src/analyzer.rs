//! Pure predicates over a resolved subject
//!
//! Everything here is synchronous and side-effect free; the asynchronous
//! evaluator resolves the subject and compiled patterns first, then asks
//! these functions for the boolean answer. An absent subject never
//! satisfies any predicate.

use crate::types::Subject;
use regex::Regex;

/// Whether the subject holds the named role
pub fn has_role(subject: Option<&Subject>, name: &str) -> bool {
    subject
        .map(|s| s.roles.iter().any(|r| r.name == name))
        .unwrap_or(false)
}

/// Test an ordered sequence of role groups against the subject
///
/// Within one group every name must be satisfied (a `!` prefix negates the
/// requirement); across groups the first satisfied group wins. Group order
/// only affects short-circuit efficiency, never the result.
pub fn check_role_groups(subject: Option<&Subject>, role_groups: &[Vec<String>]) -> bool {
    let Some(subject) = subject else {
        return false;
    };

    role_groups
        .iter()
        .any(|group| group_matches(subject, group))
}

fn group_matches(subject: &Subject, group: &[String]) -> bool {
    group.iter().all(|name| match name.strip_prefix('!') {
        Some(negated) => !has_role(Some(subject), negated),
        None => has_role(Some(subject), name),
    })
}

/// Whether the subject holds a permission whose value equals `value`
pub fn check_pattern_equality(subject: Option<&Subject>, value: &str) -> bool {
    subject
        .map(|s| s.permissions.iter().any(|p| p.value == value))
        .unwrap_or(false)
}

/// Whether any held permission value fully matches the compiled pattern
pub fn check_regex_pattern(subject: Option<&Subject>, pattern: &Regex) -> bool {
    subject
        .map(|s| s.permissions.iter().any(|p| pattern.is_match(&p.value)))
        .unwrap_or(false)
}
