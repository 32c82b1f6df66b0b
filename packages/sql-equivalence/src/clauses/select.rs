use super::{ExprContext, ExprKind, FromInfo};
use crate::comparison::{diff_multisets, ComparisonResult, MultisetDiff};
use crate::tree::NodeRef;
use crate::Fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Column,
    Function,
    Expression,
}

impl ItemKind {
    fn plural(self) -> &'static str {
        match self {
            ItemKind::Column => "columns",
            ItemKind::Function => "functions",
            ItemKind::Expression => "expressions",
        }
    }
}

/// One rendered item of a select list or GROUP BY list.
///
/// An `unrecognized` item holds an expression shape the renderer does not know. It never
/// matches another item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub kind: ItemKind,
    pub text: String,
    pub alias: Option<String>,
    pub unrecognized: bool,
}

impl SelectItem {
    pub fn new(kind: ItemKind, text: impl Into<String>, alias: Option<&str>) -> Self {
        Self {
            kind,
            text: text.into(),
            alias: alias.map(str::to_string),
            unrecognized: false,
        }
    }

    /// Renders `expr` and classifies it by its node kind.
    pub fn classify(ctx: &ExprContext<'_>, expr: NodeRef<'_>, alias: Option<&str>) -> Self {
        let kind = match ExprKind::of(expr) {
            ExprKind::ColumnRef => ItemKind::Column,
            ExprKind::FuncCall => ItemKind::Function,
            _ => ItemKind::Expression,
        };
        let (text, unrecognized) = ctx.resolve_checked(expr);
        Self {
            unrecognized,
            ..Self::new(kind, text, alias)
        }
    }
}

/// Canonical select list. `items` keeps source order, which ORDER BY positions refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectInfo {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
}

impl SelectInfo {
    pub fn extract(stmt: NodeRef<'_>, from: &FromInfo) -> Self {
        let ctx = ExprContext::new(&from.tables);
        let mut info = SelectInfo::default();
        info.collect(&ctx, stmt);
        info
    }

    fn collect(&mut self, ctx: &ExprContext<'_>, stmt: NodeRef<'_>) {
        self.distinct |= stmt.child("distinctClause").is_some();

        match stmt.child("targetList") {
            Some(targets) => {
                for target in targets.children().filter(|t| t.key() == "ResTarget") {
                    if let Some(expr) = target.child("val").and_then(|val| val.first_child()) {
                        let alias = target.value_of("name");
                        self.items.push(SelectItem::classify(ctx, expr, alias));
                    }
                }
            }
            None => {
                for arm in ["larg", "rarg"].iter().filter_map(|key| stmt.child(key)) {
                    self.collect(ctx, arm);
                }
            }
        }
    }

    pub fn texts(&self, kind: ItemKind) -> Vec<&str> {
        texts(&self.items, kind)
    }

    pub fn columns(&self) -> Vec<&str> {
        self.texts(ItemKind::Column)
    }

    pub fn functions(&self) -> Vec<&str> {
        self.texts(ItemKind::Function)
    }

    pub fn expressions(&self) -> Vec<&str> {
        self.texts(ItemKind::Expression)
    }

    pub fn compare(&self, candidate: &SelectInfo) -> ComparisonResult {
        if self.items.is_empty() && candidate.items.is_empty() {
            return ComparisonResult::both_absent();
        }

        let mut result = ComparisonResult::default();

        if self.distinct != candidate.distinct {
            if self.distinct {
                result.record_mismatch("DISTINCT", "Missing DISTINCT keyword.");
                result.add_hint("Add the DISTINCT keyword to eliminate duplicate rows.");
            } else {
                result.record_mismatch("DISTINCT", "Unexpected DISTINCT keyword.");
                result.add_hint("Remove the DISTINCT keyword if duplicate rows are acceptable.");
            }
        } else if self.distinct {
            result.record_match("DISTINCT");
        }

        compare_items(&mut result, "SELECT", &self.items, &candidate.items);

        result.finish()
    }
}

pub(crate) fn texts(items: &[SelectItem], kind: ItemKind) -> Vec<&str> {
    items
        .iter()
        .filter(|item| item.kind == kind)
        .map(|item| item.text.as_str())
        .collect()
}

/// Compares columns, functions and expressions as three independent multisets.
pub(crate) fn compare_items(
    result: &mut ComparisonResult,
    clause: &str,
    reference: &[SelectItem],
    candidate: &[SelectItem],
) {
    for kind in [ItemKind::Column, ItemKind::Function, ItemKind::Expression] {
        let expected = texts(reference, kind);
        let found = texts(candidate, kind);
        if expected.is_empty() && found.is_empty() {
            continue;
        }

        let noun = kind.plural();
        let diff = diff_items(reference, candidate, kind);
        if !result.check_diff(&format!("{clause} {noun}"), noun, &diff) {
            if !diff.missing.is_empty() {
                result.add_hint(format!(
                    "Add the missing {noun} {} to your {clause} clause.",
                    Fmt(&diff.missing)
                ));
            }
            if !diff.extra.is_empty() {
                result.add_hint(format!(
                    "Remove the extra {noun} {} from your {clause} clause.",
                    Fmt(&diff.extra)
                ));
            }
        }
    }
}

/// Multiset difference of the items of one kind. Unrecognized items are always reported.
fn diff_items(
    reference: &[SelectItem],
    candidate: &[SelectItem],
    kind: ItemKind,
) -> MultisetDiff {
    let split = |items: &[SelectItem], unrecognized: bool| -> Vec<String> {
        items
            .iter()
            .filter(|item| item.kind == kind && item.unrecognized == unrecognized)
            .map(|item| item.text.clone())
            .collect()
    };

    let mut diff = diff_multisets(&split(reference, false), &split(candidate, false));
    diff.missing.extend(split(reference, true));
    diff.extra.extend(split(candidate, true));
    diff.missing.sort();
    diff.extra.sort();
    diff
}
