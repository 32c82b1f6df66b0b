use derive_more::Display;

use super::{ExprContext, FromInfo, SelectInfo};
use crate::comparison::ComparisonResult;
use crate::condition::{compare_conditions, ConditionNode};
use crate::tree::NodeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FilterClause {
    #[display("WHERE")]
    Where,
    #[display("HAVING")]
    Having,
}

impl FilterClause {
    fn key(self) -> &'static str {
        match self {
            FilterClause::Where => "whereClause",
            FilterClause::Having => "havingClause",
        }
    }
}

/// The condition of a WHERE or HAVING clause, if present.
///
/// A set operation (UNION, INTERSECT, EXCEPT) has no clause of its own. Its `arms` hold
/// the filters of `larg` and `rarg`, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterInfo {
    pub clause: FilterClause,
    pub condition: Option<ConditionNode>,
    pub arms: Vec<FilterInfo>,
}

impl FilterInfo {
    /// Select aliases are visible to the condition, so `WHERE total > 5` reads the
    /// aliased item.
    pub fn extract(
        clause: FilterClause,
        stmt: NodeRef<'_>,
        from: &FromInfo,
        select: &SelectInfo,
    ) -> Self {
        let ctx = ExprContext::new(&from.tables).with_select(&select.items);
        let own = stmt.child(clause.key());
        let arms = match own {
            Some(_) => Vec::new(),
            None => ["larg", "rarg"]
                .iter()
                .filter_map(|key| stmt.child(key))
                .map(|arm| Self::extract(clause, arm, from, select))
                .collect(),
        };

        Self {
            clause,
            condition: ConditionNode::from_clause(&ctx, own),
            arms,
        }
    }

    pub fn extract_where(stmt: NodeRef<'_>, from: &FromInfo, select: &SelectInfo) -> Self {
        Self::extract(FilterClause::Where, stmt, from, select)
    }

    pub fn extract_having(stmt: NodeRef<'_>, from: &FromInfo, select: &SelectInfo) -> Self {
        Self::extract(FilterClause::Having, stmt, from, select)
    }

    /// The condition of every query block, with set operation arms flattened left to right.
    pub fn conditions(&self) -> Vec<Option<&ConditionNode>> {
        if self.arms.is_empty() {
            vec![self.condition.as_ref()]
        } else {
            self.arms.iter().flat_map(FilterInfo::conditions).collect()
        }
    }

    /// Set operation arms are compared positionally.
    pub fn compare(&self, candidate: &FilterInfo) -> ComparisonResult {
        let clause = self.clause;
        let expected = self.conditions();
        let found = candidate.conditions();
        let mut result = ComparisonResult::default();

        if expected.len() != found.len() {
            let filtered = |blocks: &[Option<&ConditionNode>]| blocks.iter().any(Option::is_some);
            if filtered(&expected) || filtered(&found) {
                result.record_mismatch(
                    format!("{clause} condition"),
                    format!(
                        "Expected {} query blocks but found {}.",
                        expected.len(),
                        found.len()
                    ),
                );
                result.add_hint(format!(
                    "Check the {clause} clause of each query in the set operation."
                ));
            }
            return result.finish();
        }

        let single = expected.len() == 1;
        for (index, (expected, found)) in expected.into_iter().zip(found).enumerate() {
            let part = if single {
                format!("{clause} condition")
            } else {
                format!("{clause} condition (query {})", index + 1)
            };
            compare_condition(&mut result, clause, part, expected, found);
        }

        result.finish()
    }
}

fn compare_condition(
    result: &mut ComparisonResult,
    clause: FilterClause,
    part: String,
    expected: Option<&ConditionNode>,
    found: Option<&ConditionNode>,
) {
    match (expected, found) {
        (None, None) => {}
        (Some(expected), None) => {
            result.record_mismatch(part, format!("Missing {clause} clause."));
            result.add_hint(format!("Add a {clause} clause filtering on: {expected}."));
        }
        (None, Some(_)) => {
            result.record_mismatch(part, format!("Unexpected {clause} clause."));
            result.add_hint(format!("Remove the {clause} clause."));
        }
        (Some(expected), Some(found)) => match compare_conditions(expected, found) {
            Ok(()) => result.record_match(part),
            Err(mismatch) => {
                let explanation = format!("{clause} condition differs: {mismatch}.");
                result.record_mismatch(part, explanation);
                result.add_hint(format!("Review the conditions in your {clause} clause."));
            }
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::*;
    use crate::{statement_node, Equality};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn filter_info(clause: FilterClause, statement: Value) -> FilterInfo {
        let tree = statement_tree(statement);
        let stmt = statement_node(tree.root()).unwrap();
        let from = FromInfo::extract(stmt);
        let select = SelectInfo::extract(stmt, &from);
        FilterInfo::extract(clause, stmt, &from, &select)
    }

    fn where_select(condition: Value) -> Value {
        with(
            select(vec![res_target(col(&["title"]), None)], vec![range_var("songs", Some("s"))]),
            "whereClause",
            condition,
        )
    }

    #[test]
    fn swapped_and_operands_are_equal() {
        let reference = filter_info(
            FilterClause::Where,
            where_select(and(vec![
                op_expr(col(&["title"]), "=", string("Star Wars")),
                op_expr(col(&["album"]), "=", string("my album")),
            ])),
        );
        let candidate = filter_info(
            FilterClause::Where,
            where_select(and(vec![
                op_expr(col(&["s", "album"]), "=", string("my album")),
                op_expr(string("Star Wars"), "=", col(&["title"])),
            ])),
        );

        let result = reference.compare(&candidate);

        // `s.album` resolves to `songs.album`, which is not the bare `album`
        assert_eq!(result.equality, Equality::Unequal);

        let candidate = filter_info(
            FilterClause::Where,
            where_select(and(vec![
                op_expr(col(&["album"]), "=", string("my album")),
                op_expr(string("Star Wars"), "=", col(&["title"])),
            ])),
        );
        assert_eq!(reference.compare(&candidate).equality, Equality::Equal);
    }

    #[test]
    fn having_reads_select_aliases() {
        let statement = with(
            select(
                vec![res_target(func("count", vec![], true), Some("total"))],
                vec![range_var("t", None)],
            ),
            "havingClause",
            op_expr(col(&["total"]), ">", int(5)),
        );

        let info = filter_info(FilterClause::Having, statement);

        assert_eq!(info.condition, Some(ConditionNode::simple("count(*)", ">", "5")));
    }

    #[test]
    fn presence_mismatch_has_hint() {
        let reference = filter_info(
            FilterClause::Where,
            where_select(op_expr(col(&["id"]), "=", int(1))),
        );
        let candidate = filter_info(
            FilterClause::Where,
            select(vec![res_target(col(&["title"]), None)], vec![range_var("songs", None)]),
        );

        let result = reference.compare(&candidate);

        assert_eq!(result.mismatched, vec!["WHERE condition"]);
        assert_eq!(result.explanation, vec!["Missing WHERE clause."]);
        assert_eq!(result.hints, vec!["Add a WHERE clause filtering on: id = 1."]);

        let result = candidate.compare(&reference);
        assert_eq!(result.explanation, vec!["Unexpected WHERE clause."]);
    }

    #[test]
    fn absent_on_both_sides() {
        let info = filter_info(
            FilterClause::Having,
            select(vec![res_target(col(&["a"]), None)], vec![range_var("t", None)]),
        );

        assert!(info.compare(&info).is_both_absent());
    }

    fn union(left: Value, right: Value) -> Value {
        let body = |arm: Value| arm.get("SelectStmt").cloned().unwrap_or(arm);
        json!({ "SelectStmt": {
            "op": "SETOP_UNION",
            "larg": body(left),
            "rarg": body(right),
            "limitOption": "LIMIT_OPTION_DEFAULT"
        } })
    }

    #[test]
    fn set_operation_arms_are_compared_in_order() {
        let songs = || {
            select(vec![res_target(col(&["title"]), None)], vec![range_var("songs", None)])
        };
        let filtered = |id: i64| with(songs(), "whereClause", op_expr(col(&["id"]), "=", int(id)));

        let reference = filter_info(FilterClause::Where, union(filtered(1), songs()));

        assert_eq!(reference.condition, None);
        assert_eq!(
            reference.conditions(),
            vec![Some(&ConditionNode::simple("id", "=", "1")), None]
        );
        assert!(reference.compare(&reference).is_equal());

        let swapped = filter_info(FilterClause::Where, union(songs(), filtered(1)));
        let result = reference.compare(&swapped);

        assert_eq!(
            result.mismatched,
            vec!["WHERE condition (query 1)", "WHERE condition (query 2)"]
        );
        assert_eq!(
            result.explanation,
            vec!["Missing WHERE clause.", "Unexpected WHERE clause."]
        );

        let changed = filter_info(FilterClause::Where, union(filtered(2), songs()));
        assert_eq!(reference.compare(&changed).mismatched, vec!["WHERE condition (query 1)"]);
    }

    #[test]
    fn set_operation_against_single_query() {
        let songs = || {
            select(vec![res_target(col(&["title"]), None)], vec![range_var("songs", None)])
        };
        let filtered = with(songs(), "whereClause", op_expr(col(&["id"]), "=", int(1)));

        let reference = filter_info(FilterClause::Where, union(filtered.clone(), songs()));
        let candidate = filter_info(FilterClause::Where, filtered);

        let result = reference.compare(&candidate);
        assert_eq!(result.explanation, vec!["Expected 2 query blocks but found 1."]);

        let plain = filter_info(FilterClause::Having, union(songs(), songs()));
        let single = filter_info(FilterClause::Having, songs());
        assert!(plain.compare(&single).is_both_absent());
    }
}
