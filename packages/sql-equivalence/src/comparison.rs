use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// Outcome of comparing one clause (or statement) of a candidate against a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Equality {
    /// Neither side has the clause. Counts as neither correct nor incorrect.
    #[default]
    BothAbsent,
    Unequal,
    Equal,
}

/// Structured diff produced by every comparator.
///
/// `matched` and `mismatched` hold part names such as `"Table name"` or `"Row 1 values"`.
/// `explanation` holds one line per difference and `hints` suggests how the candidate
/// could be changed to match the reference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComparisonResult {
    pub equality: Equality,
    pub matched: Vec<String>,
    pub mismatched: Vec<String>,
    pub explanation: Vec<String>,
    pub hints: Vec<String>,
}

impl ComparisonResult {
    pub fn both_absent() -> Self {
        Self::default()
    }

    pub fn is_equal(&self) -> bool {
        self.equality == Equality::Equal
    }

    pub fn is_both_absent(&self) -> bool {
        self.equality == Equality::BothAbsent
    }

    pub fn is_matched(&self, part: &str) -> bool {
        self.matched.iter().any(|p| p == part)
    }

    pub fn is_mismatched(&self, part: &str) -> bool {
        self.mismatched.iter().any(|p| p == part)
    }

    pub(crate) fn record_match(&mut self, part: impl Into<String>) {
        self.matched.push(part.into());
    }

    pub(crate) fn record_mismatch(
        &mut self,
        part: impl Into<String>,
        explanation: impl Into<String>,
    ) {
        self.mismatched.push(part.into());
        self.explanation.push(explanation.into());
    }

    pub(crate) fn add_explanation(&mut self, explanation: impl Into<String>) {
        self.explanation.push(explanation.into());
    }

    pub(crate) fn add_hint(&mut self, hint: impl Into<String>) {
        self.hints.push(hint.into());
    }

    /// Records `part` as matched when `same`, otherwise as mismatched with the explanation
    /// produced by `explain`. Returns `same`.
    pub(crate) fn check<F>(&mut self, part: impl Into<String>, same: bool, explain: F) -> bool
    where
        F: FnOnce() -> String,
    {
        if same {
            self.record_match(part);
        } else {
            self.record_mismatch(part, explain());
        }
        same
    }

    /// Records a set or multiset difference under `part`, listing missing and extra items.
    pub(crate) fn check_diff(&mut self, part: &str, noun: &str, diff: &MultisetDiff) -> bool {
        if diff.is_empty() {
            self.record_match(part);
            return true;
        }

        self.mismatched.push(part.to_string());
        if !diff.missing.is_empty() {
            self.add_explanation(format!("Missing {noun}: {}", crate::Fmt(&diff.missing)));
        }
        if !diff.extra.is_empty() {
            self.add_explanation(format!("Extra {noun}: {}", crate::Fmt(&diff.extra)));
        }
        false
    }

    /// Folds a clause-level result into this statement-level one under a single part name.
    /// Clauses absent on both sides leave no trace.
    pub(crate) fn absorb(&mut self, part: &str, clause: ComparisonResult) {
        match clause.equality {
            Equality::BothAbsent => {}
            Equality::Equal => self.record_match(part),
            Equality::Unequal => {
                self.mismatched.push(part.to_string());
                self.explanation.extend(clause.explanation);
                self.hints.extend(clause.hints);
            }
        }
    }

    /// Appends every part, explanation and hint of `other`.
    pub(crate) fn merge(&mut self, other: ComparisonResult) {
        self.matched.extend(other.matched);
        self.mismatched.extend(other.mismatched);
        self.explanation.extend(other.explanation);
        self.hints.extend(other.hints);
    }

    /// Settles `equality` from the recorded parts.
    pub(crate) fn finish(mut self) -> Self {
        self.equality = if !self.mismatched.is_empty() {
            Equality::Unequal
        } else if self.matched.is_empty() {
            Equality::BothAbsent
        } else {
            Equality::Equal
        };
        self
    }
}

impl Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.explanation {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Items present only in the reference (`missing`) or only in the candidate (`extra`),
/// each sorted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultisetDiff {
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

impl MultisetDiff {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Compares two lists as multisets. The result does not depend on the order of either list.
pub fn diff_multisets<S: AsRef<str>>(reference: &[S], candidate: &[S]) -> MultisetDiff {
    let mut counts: BTreeMap<&str, isize> = BTreeMap::new();
    let mut diff = MultisetDiff::default();

    for item in reference.iter().map(AsRef::as_ref) {
        *counts.entry(item).or_default() += 1;
    }

    for item in candidate.iter().map(AsRef::as_ref) {
        *counts.entry(item).or_default() -= 1;
    }

    for (item, count) in counts {
        for _ in 0..count.max(0) {
            diff.missing.push(item.to_string());
        }
        for _ in 0..(-count).max(0) {
            diff.extra.push(item.to_string());
        }
    }

    diff.missing.sort();
    diff.extra.sort();
    diff
}

/// Compares two lists as sets: duplicates on either side are ignored.
pub fn diff_sets<S: AsRef<str>>(reference: &[S], candidate: &[S]) -> MultisetDiff {
    let mut reference: Vec<&str> = reference.iter().map(AsRef::as_ref).collect();
    let mut candidate: Vec<&str> = candidate.iter().map(AsRef::as_ref).collect();
    reference.sort_unstable();
    reference.dedup();
    candidate.sort_unstable();
    candidate.dedup();

    diff_multisets(&reference, &candidate)
}
