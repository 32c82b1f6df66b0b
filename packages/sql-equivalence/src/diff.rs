//! Statement-level and document-level comparison.
//!
//! A statement is extracted into a [`StatementInfo`] and compared with the comparator of its
//! kind. A document holding several statements pairs each reference statement with the first
//! unused candidate statement of the same kind.

use tracing::debug;

use crate::clauses::{
    AlterInfo, AssertionInfo, CreateInfo, DeleteInfo, FilterInfo, FromInfo, GroupByInfo,
    InsertInfo, OrderByInfo, SelectInfo, UpdateInfo, ViewInfo,
};
use crate::comparison::ComparisonResult;
use crate::edit_distance::tree_edit_distance;
use crate::log::COMPARE;
use crate::statement::{all_statements, is_statement_type, statement_node, StatementKind};
use crate::tree::{NodeRef, Tree};

/// The six clause records of a SELECT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatementInfo {
    pub from: FromInfo,
    pub select: SelectInfo,
    pub filter: FilterInfo,
    pub group_by: GroupByInfo,
    pub having: FilterInfo,
    pub order_by: OrderByInfo,
}

impl SelectStatementInfo {
    /// Sources come first because every other clause resolves aliases against them, and
    /// WHERE, HAVING and ORDER BY read the select list's output aliases.
    pub fn extract(stmt: NodeRef<'_>) -> Self {
        let from = FromInfo::extract(stmt);
        let select = SelectInfo::extract(stmt, &from);
        let filter = FilterInfo::extract_where(stmt, &from, &select);
        let group_by = GroupByInfo::extract(stmt, &from);
        let having = FilterInfo::extract_having(stmt, &from, &select);
        let order_by = OrderByInfo::extract(stmt, &from, &select);

        Self {
            from,
            select,
            filter,
            group_by,
            having,
            order_by,
        }
    }

    pub fn compare(&self, candidate: &SelectStatementInfo) -> ComparisonResult {
        let mut result = ComparisonResult::default();

        result.absorb("SELECT clause", self.select.compare(&candidate.select));
        result.absorb("FROM clause", self.from.compare(&candidate.from));
        result.absorb("WHERE clause", self.filter.compare(&candidate.filter));
        result.absorb("GROUP BY clause", self.group_by.compare(&candidate.group_by));
        result.absorb("HAVING clause", self.having.compare(&candidate.having));
        result.absorb("ORDER BY clause", self.order_by.compare(&candidate.order_by));

        result.finish()
    }
}

/// A statement extracted with the extractor of its kind. `Other` keeps the statement node
/// for a structural comparison.
#[derive(Debug, Clone)]
pub enum StatementInfo<'a> {
    Select(SelectStatementInfo),
    Insert(InsertInfo),
    Update(UpdateInfo),
    Delete(DeleteInfo),
    CreateTable(CreateInfo),
    AlterTable(AlterInfo),
    CreateView(ViewInfo),
    CreateAssertion(AssertionInfo),
    Other(StatementKind, NodeRef<'a>),
}

impl<'a> StatementInfo<'a> {
    /// `stmt` is the statement node itself, such as a `SelectStmt`.
    pub fn extract(stmt: NodeRef<'a>) -> Self {
        match StatementKind::from_key(stmt.key()) {
            StatementKind::Select => StatementInfo::Select(SelectStatementInfo::extract(stmt)),
            StatementKind::Insert => StatementInfo::Insert(InsertInfo::extract(stmt)),
            StatementKind::Update => StatementInfo::Update(UpdateInfo::extract(stmt)),
            StatementKind::Delete => StatementInfo::Delete(DeleteInfo::extract(stmt)),
            StatementKind::CreateTable => StatementInfo::CreateTable(CreateInfo::extract(stmt)),
            StatementKind::AlterTable | StatementKind::Rename => {
                StatementInfo::AlterTable(AlterInfo::extract(stmt))
            }
            StatementKind::CreateView => StatementInfo::CreateView(ViewInfo::extract(stmt)),
            StatementKind::CreateAssertion => {
                StatementInfo::CreateAssertion(AssertionInfo::extract(stmt))
            }
            kind @ StatementKind::Other(_) => StatementInfo::Other(kind, stmt),
        }
    }

    /// The kind statements are paired by. A `RenameStmt` pairs with ALTER TABLE.
    pub fn kind(&self) -> StatementKind {
        match self {
            StatementInfo::Select(_) => StatementKind::Select,
            StatementInfo::Insert(_) => StatementKind::Insert,
            StatementInfo::Update(_) => StatementKind::Update,
            StatementInfo::Delete(_) => StatementKind::Delete,
            StatementInfo::CreateTable(_) => StatementKind::CreateTable,
            StatementInfo::AlterTable(_) => StatementKind::AlterTable,
            StatementInfo::CreateView(_) => StatementKind::CreateView,
            StatementInfo::CreateAssertion(_) => StatementKind::CreateAssertion,
            StatementInfo::Other(kind, _) => kind.clone(),
        }
    }

    pub fn compare(&self, candidate: &StatementInfo<'_>) -> ComparisonResult {
        match (self, candidate) {
            (StatementInfo::Select(expected), StatementInfo::Select(found)) => {
                expected.compare(found)
            }
            (StatementInfo::Insert(expected), StatementInfo::Insert(found)) => {
                expected.compare(found)
            }
            (StatementInfo::Update(expected), StatementInfo::Update(found)) => {
                expected.compare(found)
            }
            (StatementInfo::Delete(expected), StatementInfo::Delete(found)) => {
                expected.compare(found)
            }
            (StatementInfo::CreateTable(expected), StatementInfo::CreateTable(found)) => {
                expected.compare(found)
            }
            (StatementInfo::AlterTable(expected), StatementInfo::AlterTable(found)) => {
                expected.compare(found)
            }
            (StatementInfo::CreateView(expected), StatementInfo::CreateView(found)) => {
                expected.compare(found)
            }
            (StatementInfo::CreateAssertion(expected), StatementInfo::CreateAssertion(found)) => {
                expected.compare(found)
            }
            (StatementInfo::Other(kind, expected), StatementInfo::Other(found_kind, found))
                if kind == found_kind =>
            {
                compare_structure(kind, *expected, *found)
            }
            (expected, found) => {
                let (expected, found) = (expected.kind(), found.kind());
                let mut result = ComparisonResult::default();
                result.record_mismatch(
                    "Statement Type",
                    format!("Expected a {expected} statement but found a {found} statement."),
                );
                result.add_hint(format!("Write a {expected} statement."));
                result.finish()
            }
        }
    }
}

/// Statements without a dedicated comparator are equal only when their trees are identical.
fn compare_structure(
    kind: &StatementKind,
    expected: NodeRef<'_>,
    found: NodeRef<'_>,
) -> ComparisonResult {
    let mut result = ComparisonResult::default();
    let distance = tree_edit_distance(expected, found);
    let part = format!("{kind} statement");

    debug!(target: COMPARE, msg = "Structural comparison", kind = %kind, distance);

    if distance == 0 {
        result.record_match(part);
    } else {
        result.record_mismatch(
            part,
            format!("The {kind} statement differs from the reference (edit distance {distance})."),
        );
    }

    result.finish()
}

/// Resolves a document root or `stmt` wrapper to the statement node it holds.
fn resolve(node: NodeRef<'_>) -> Option<NodeRef<'_>> {
    if is_statement_type(node.key()) {
        Some(node)
    } else {
        statement_node(node)
    }
}

/// Compares two single statements. Either side may be a document root, a `stmt` wrapper or
/// the statement node itself.
pub fn compare_statements(reference: NodeRef<'_>, candidate: NodeRef<'_>) -> ComparisonResult {
    match (resolve(reference), resolve(candidate)) {
        (Some(reference), Some(candidate)) => {
            let expected = StatementInfo::extract(reference);
            let found = StatementInfo::extract(candidate);
            debug!(
                target: COMPARE,
                msg = "Comparing statements",
                reference = %expected.kind(),
                candidate = %found.kind()
            );
            expected.compare(&found)
        }
        (Some(reference), None) => {
            let kind = StatementInfo::extract(reference).kind();
            let mut result = ComparisonResult::default();
            result.record_mismatch(
                format!("{kind} statement"),
                format!("Missing {kind} statement."),
            );
            result.finish()
        }
        (None, Some(candidate)) => {
            let kind = StatementInfo::extract(candidate).kind();
            let mut result = ComparisonResult::default();
            result.record_mismatch(format!("Extra {kind}"), format!("Extra {kind} statement."));
            result.finish()
        }
        (None, None) => ComparisonResult::both_absent(),
    }
}

/// Compares every statement of two parsed documents.
pub fn compare_queries(reference: &Tree, candidate: &Tree) -> ComparisonResult {
    let expected: Vec<StatementInfo<'_>> = statements(reference);
    let found: Vec<StatementInfo<'_>> = statements(candidate);

    debug!(
        target: COMPARE,
        msg = "Comparing documents",
        reference_statements = expected.len(),
        candidate_statements = found.len()
    );

    if expected.is_empty() && found.is_empty() {
        return ComparisonResult::both_absent();
    }

    let mut result = ComparisonResult::default();
    let mut used = vec![false; found.len()];

    for statement in &expected {
        let kind = statement.kind();
        let pair = found
            .iter()
            .enumerate()
            .find(|(index, candidate)| !used[*index] && candidate.kind() == kind);

        match pair {
            Some((index, candidate)) => {
                used[index] = true;
                result.merge(statement.compare(candidate));
            }
            None => {
                result.record_mismatch(
                    format!("{kind} statement"),
                    format!("Missing {kind} statement."),
                );
                result.add_hint(format!("Add the {kind} statement."));
            }
        }
    }

    for (candidate, _) in found.iter().zip(&used).filter(|(_, used)| !**used) {
        let kind = candidate.kind();
        result.record_mismatch(format!("Extra {kind}"), format!("Extra {kind} statement."));
        result.add_hint(format!("Remove the {kind} statement."));
    }

    result.finish()
}

fn statements(tree: &Tree) -> Vec<StatementInfo<'_>> {
    all_statements(tree.root())
        .into_iter()
        .filter_map(|wrapper| wrapper.first_child())
        .map(StatementInfo::extract)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::*;
    use crate::Equality;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn users_select(column: &str) -> Value {
        with(
            select(vec![res_target(col(&[column]), None)], vec![range_var("users", None)]),
            "whereClause",
            op_expr(col(&["id"]), "=", int(1)),
        )
    }

    fn delete(table: &str) -> Value {
        json!({ "DeleteStmt": { "relation": relation(table) } })
    }

    #[test]
    fn select_reports_clause_level_parts() {
        let reference = statement_tree(users_select("name"));
        let candidate = statement_tree(users_select("email"));

        let result = compare_statements(reference.root(), candidate.root());

        assert_eq!(result.equality, Equality::Unequal);
        assert_eq!(result.matched, vec!["FROM clause", "WHERE clause"]);
        assert_eq!(result.mismatched, vec!["SELECT clause"]);
        assert_eq!(
            result.explanation,
            vec!["Missing columns: 'name'", "Extra columns: 'email'"]
        );
    }

    #[test]
    fn statement_pairing_is_logged() {
        let (writer, _guard) = trace();
        let reference = statement_tree(users_select("name"));

        compare_statements(reference.root(), reference.root());

        let log_contents = writer.get_string();
        assert!(log_contents.contains("compare:"));
        assert!(log_contents.contains("Comparing statements"));
    }

    #[test]
    fn different_kinds_are_a_type_mismatch() {
        let reference = statement_tree(users_select("name"));
        let candidate = statement_tree(delete("users"));

        let result = compare_statements(reference.root(), candidate.root());

        assert_eq!(result.mismatched, vec!["Statement Type"]);
        assert_eq!(
            result.explanation,
            vec!["Expected a SELECT statement but found a DELETE statement."]
        );
    }

    #[test]
    fn unsupported_statements_compare_structurally() {
        let truncate = |table: &str| {
            json!({ "TruncateStmt": {
                "relations": [range_var(table, None)],
                "behavior": "DROP_RESTRICT"
            } })
        };
        let reference = statement_tree(truncate("logs"));

        let result = compare_statements(reference.root(), statement_tree(truncate("logs")).root());
        assert_eq!(result.matched, vec!["TruncateStmt statement"]);

        let result = compare_statements(reference.root(), statement_tree(truncate("audit")).root());
        assert_eq!(result.mismatched, vec!["TruncateStmt statement"]);
        assert_eq!(
            result.explanation,
            vec!["The TruncateStmt statement differs from the reference (edit distance 1)."]
        );
    }

    #[test]
    fn documents_pair_statements_by_kind() {
        let reference = Tree::from_json(&document(vec![users_select("name"), delete("logs")]));
        let candidate = Tree::from_json(&document(vec![
            delete("logs"),
            users_select("name"),
            delete("audit"),
        ]));

        let result = compare_queries(&reference, &candidate);

        assert_eq!(
            result.matched,
            vec!["SELECT clause", "FROM clause", "WHERE clause", "Target table"]
        );
        assert_eq!(result.mismatched, vec!["Extra DELETE"]);
        assert_eq!(result.explanation, vec!["Extra DELETE statement."]);
    }

    #[test]
    fn unpaired_reference_statement_is_missing() {
        let reference = Tree::from_json(&document(vec![users_select("name"), delete("logs")]));
        let candidate = Tree::from_json(&document(vec![users_select("name")]));

        let result = compare_queries(&reference, &candidate);

        assert_eq!(result.mismatched, vec!["DELETE statement"]);
        assert_eq!(result.explanation, vec!["Missing DELETE statement."]);
    }

    #[test]
    fn empty_documents_are_absent() {
        let empty = Tree::from_json(&json!({ "version": 170004, "stmts": [] }));

        assert!(compare_queries(&empty, &empty).is_both_absent());
    }
}
