//! Version ranges, in the notation used by `package.json` files.
//!
//! Ranges are matched with the [`semver`] crate, after translating the range
//! notation into [`VersionReq`] alternatives:
//!
//! - a bare version (`1.2.0`, `1.2`) is exact,
//! - `*`, `x` and the empty range match any release,
//! - whitespace-separated comparators are intersected (`>=1.0.0 <2.0.0`),
//! - `a - b` is the inclusive range between `a` and `b`,
//! - `||` separates alternatives, of which any may match.

use semver::{Version, VersionReq};
use zen_errors::{IntoDiagnostic, Result};

use crate::errors::InvalidVersionRange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    alternatives: Vec<VersionReq>,
}

impl Range {
    /// Parses the given version range.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any alternative of the range is not a valid set of
    /// comparators.
    pub fn parse(input: &str) -> Result<Self> {
        let mut alternatives = Vec::new();

        for alternative in input.split("||") {
            let normalized = normalize(alternative.trim());

            match VersionReq::parse(&normalized) {
                Ok(req) => alternatives.push(req),
                Err(err) => {
                    return Err(InvalidVersionRange {
                        range: input.to_string(),
                        inner: vec![err.into_diagnostic()],
                    }
                    .into());
                }
            }
        }

        Ok(Range { alternatives })
    }

    /// Determines whether the given version satisfies any alternative.
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

fn is_wildcard(token: &str) -> bool {
    matches!(token, "" | "*" | "x" | "X" | "latest")
}

fn is_operator(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^'))
}

/// Translates a single comparator, such that bare versions become exact.
fn comparator(token: &str) -> String {
    let token = token.strip_prefix('v').unwrap_or(token);

    if is_wildcard(token) {
        return String::from("*");
    }

    let starts_with_digit = token.starts_with(|c: char| c.is_ascii_digit());
    let core = token.split(['-', '+']).next().unwrap_or_default();
    let has_wildcard = core.contains(['*', 'x', 'X']);

    if starts_with_digit && !has_wildcard {
        format!("={token}")
    } else {
        token.to_string()
    }
}

fn normalize(alternative: &str) -> String {
    let tokens = alternative.split_whitespace().collect::<Vec<_>>();

    if let [from, "-", to] = tokens.as_slice() {
        return format!(">={from}, <={to}");
    }

    if tokens.is_empty() {
        return String::from("*");
    }

    let mut comparators = Vec::with_capacity(tokens.len());
    let mut pending_operator: Option<&str> = None;

    for token in tokens {
        if is_operator(token) {
            pending_operator = Some(token);
            continue;
        }

        match pending_operator.take() {
            Some(op) => comparators.push(format!("{op}{token}")),
            None => comparators.push(comparator(token)),
        }
    }

    comparators.join(", ")
}

/// Sorts the given versions newest-first and drops duplicates.
pub(crate) fn sort_descending(versions: &mut Vec<(String, Version)>) {
    versions.sort_by(|(_, a), (_, b)| b.cmp(a));
    versions.dedup_by(|(_, a), (_, b)| a == b);
}
