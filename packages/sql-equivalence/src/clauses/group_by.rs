use super::select::compare_items;
use super::{ExprContext, FromInfo, SelectItem};
use crate::comparison::ComparisonResult;
use crate::tree::NodeRef;

/// Canonical GROUP BY clause. Items inside grouping sets are flattened into `items`.
///
/// `empty_set` records a `()` grouping, so `GROUP BY ()` is present but has no items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupByInfo {
    pub items: Vec<SelectItem>,
    pub grouping_sets: bool,
    pub rollup: bool,
    pub cube: bool,
    pub empty_set: bool,
}

impl GroupByInfo {
    pub fn extract(stmt: NodeRef<'_>, from: &FromInfo) -> Self {
        let ctx = ExprContext::new(&from.tables);
        let mut info = GroupByInfo::default();

        if let Some(group) = stmt.child("groupClause") {
            for item in group.children() {
                info.collect(&ctx, item);
            }
        }

        info
    }

    fn collect(&mut self, ctx: &ExprContext<'_>, item: NodeRef<'_>) {
        if item.key() != "GroupingSet" {
            self.items.push(SelectItem::classify(ctx, item, None));
            return;
        }

        match item.value_of("kind") {
            Some("GROUPING_SET_SETS" | "GROUPING SETS") => self.grouping_sets = true,
            Some("GROUPING_SET_ROLLUP" | "ROLLUP") => self.rollup = true,
            Some("GROUPING_SET_CUBE" | "CUBE") => self.cube = true,
            Some("GROUPING_SET_EMPTY") => self.empty_set = true,
            _ => {}
        }

        if let Some(content) = item.child("content") {
            for nested in content.children() {
                self.collect(ctx, nested);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        let flagged = self.grouping_sets || self.rollup || self.cube || self.empty_set;
        self.items.is_empty() && !flagged
    }

    pub fn compare(&self, candidate: &GroupByInfo) -> ComparisonResult {
        let mut result = ComparisonResult::default();

        match (self.is_empty(), candidate.is_empty()) {
            (true, true) => return ComparisonResult::both_absent(),
            (false, true) => {
                result.record_mismatch("GROUP BY", "GROUP BY clause missing.");
                result.add_hint("Add a GROUP BY clause.");
                return result.finish();
            }
            (true, false) => {
                result.record_mismatch("GROUP BY", "GROUP BY clause unexpected.");
                result.add_hint("Remove the GROUP BY clause.");
                return result.finish();
            }
            (false, false) => {}
        }

        let flags = [
            ("GROUPING SETS", self.grouping_sets, candidate.grouping_sets),
            ("ROLLUP", self.rollup, candidate.rollup),
            ("CUBE", self.cube, candidate.cube),
            ("()", self.empty_set, candidate.empty_set),
        ];
        for (flag, expected, found) in flags {
            if expected || found {
                let same = result.check(flag, expected == found, || {
                    if expected {
                        format!("Missing {flag} in GROUP BY clause.")
                    } else {
                        format!("Unexpected {flag} in GROUP BY clause.")
                    }
                });
                if !same {
                    result.add_hint(format!("Check the use of {flag} in your GROUP BY clause."));
                }
            }
        }

        compare_items(&mut result, "GROUP BY", &self.items, &candidate.items);

        result.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::*;
    use crate::{statement_node, Equality, ItemKind};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn group_by(items: Vec<Value>) -> GroupByInfo {
        let statement = with(
            select(vec![res_target(col(&["a"]), None)], vec![range_var("t", Some("x"))]),
            "groupClause",
            json!(items),
        );
        let tree = statement_tree(statement);
        let stmt = statement_node(tree.root()).unwrap();
        GroupByInfo::extract(stmt, &FromInfo::extract(stmt))
    }

    #[test]
    fn items_are_classified() {
        let info = group_by(vec![col(&["x", "a"]), func("lower", vec![col(&["b"])], false)]);

        assert_eq!(
            info.items,
            vec![
                SelectItem::new(ItemKind::Column, "t.a", None),
                SelectItem::new(ItemKind::Function, "lower(b)", None),
            ]
        );
    }

    #[test]
    fn rollup_contents_are_recursed() {
        let info = group_by(vec![json!({ "GroupingSet": {
            "kind": "GROUPING_SET_ROLLUP",
            "content": [col(&["a"]), col(&["b"])]
        } })]);

        assert!(info.rollup);
        assert!(!info.cube);
        assert_eq!(info.items.len(), 2);
    }

    #[test]
    fn missing_group_by_short_circuits() {
        let reference = group_by(vec![col(&["a"])]);

        let result = reference.compare(&GroupByInfo::default());

        assert_eq!(result.mismatched, vec!["GROUP BY"]);
        assert_eq!(result.explanation, vec!["GROUP BY clause missing."]);
    }

    #[test]
    fn flags_and_items_are_compared() {
        let reference = group_by(vec![json!({ "GroupingSet": {
            "kind": "GROUPING_SET_CUBE",
            "content": [col(&["a"]), col(&["b"])]
        } })]);
        let candidate = group_by(vec![col(&["b"]), col(&["a"])]);

        let result = reference.compare(&candidate);

        assert_eq!(result.mismatched, vec!["CUBE"]);
        assert_eq!(result.matched, vec!["GROUP BY columns"]);
        assert_eq!(result.equality, Equality::Unequal);
    }

    #[test]
    fn empty_grouping_is_present() {
        let empty = || json!({ "GroupingSet": { "kind": "GROUPING_SET_EMPTY", "location": 30 } });
        let reference = group_by(vec![empty()]);

        assert!(reference.empty_set);
        assert!(reference.items.is_empty());
        assert!(!reference.is_empty());

        let result = reference.compare(&group_by(vec![empty()]));
        assert_eq!(result.equality, Equality::Equal);
        assert_eq!(result.matched, vec!["()"]);

        let result = reference.compare(&GroupByInfo::default());
        assert_eq!(result.explanation, vec!["GROUP BY clause missing."]);

        let result = reference.compare(&group_by(vec![col(&["a"])]));
        assert_eq!(result.mismatched, vec!["()", "GROUP BY columns"]);
        assert_eq!(
            result.explanation,
            vec!["Missing () in GROUP BY clause.", "Extra columns: 'a'"]
        );
    }
}
