use std::collections::BTreeMap;

use super::{ExprContext, FilterInfo, FromInfo, SelectInfo, TableRef};
use crate::comparison::ComparisonResult;
use crate::tree::NodeRef;

/// Canonical UPDATE statement. `assignments` keeps the SET order of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub table: String,
    pub assignments: Vec<(String, String)>,
    pub from: FromInfo,
    pub filter: FilterInfo,
}

impl UpdateInfo {
    pub fn extract(stmt: NodeRef<'_>) -> Self {
        let relation = stmt.child("relation");
        let table = relation
            .and_then(|relation| relation.value_of("relname"))
            .unwrap_or_default()
            .to_string();
        let from = FromInfo::extract(stmt);

        // The target is visible to SET values and the WHERE clause under its alias
        let mut scope = from.clone();
        scope.tables.insert(
            0,
            TableRef::new(
                table.clone(),
                relation
                    .and_then(|relation| relation.child("alias"))
                    .and_then(|alias| alias.value_of("aliasname")),
            ),
        );
        let ctx = ExprContext::new(&scope.tables);

        let assignments = stmt
            .child("targetList")
            .map(|targets| {
                targets
                    .children()
                    .filter(|target| target.key() == "ResTarget")
                    .map(|target| {
                        (
                            target.value_of("name").unwrap_or_default().to_string(),
                            ctx.resolve_child(target.child("val")),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        let filter = FilterInfo::extract_where(stmt, &scope, &SelectInfo::default());

        Self {
            table,
            assignments,
            from,
            filter,
        }
    }

    pub fn compare(&self, candidate: &UpdateInfo) -> ComparisonResult {
        let mut result = ComparisonResult::default();

        let same_table = result.check("Target table", self.table == candidate.table, || {
            format!(
                "The UPDATE should target table '{}', but found '{}'.",
                self.table, candidate.table
            )
        });
        if !same_table {
            result.add_hint(format!("Update the target table to '{}'.", self.table));
        }

        self.compare_assignments(&mut result, candidate);

        result.absorb("FROM clause", self.from.compare(&candidate.from));
        result.absorb("WHERE clause", self.filter.compare(&candidate.filter));

        result.finish()
    }

    fn compare_assignments(&self, result: &mut ComparisonResult, candidate: &UpdateInfo) {
        let (expected_len, found_len) = (self.assignments.len(), candidate.assignments.len());
        if expected_len != found_len {
            result.record_mismatch(
                "Set clauses count",
                format!("Expected {expected_len} SET column(s), but found {found_len}."),
            );
            result.add_hint("Ensure you set the correct number of columns in your UPDATE.");
            return;
        }

        let expected: BTreeMap<&str, &str> = pairs(&self.assignments);
        let found: BTreeMap<&str, &str> = pairs(&candidate.assignments);
        let mut all_match = true;

        for (column, value) in expected {
            match found.get(column) {
                None => {
                    all_match = false;
                    result.record_mismatch(
                        format!("Set clause column ({column})"),
                        format!("Missing SET clause for column '{column}'."),
                    );
                    result.add_hint(format!("Add the SET clause for column '{column}'."));
                }
                Some(found) if *found != value => {
                    all_match = false;
                    result.record_mismatch(
                        format!("Value for '{column}'"),
                        format!(
                            "For column '{column}', the value should be '{value}', but found \
                             '{found}'."
                        ),
                    );
                    result.add_hint(format!("Fix the value assignment for column '{column}'."));
                }
                Some(_) => {}
            }
        }

        if all_match {
            result.record_match("Set clauses");
        }
    }
}

fn pairs(assignments: &[(String, String)]) -> BTreeMap<&str, &str> {
    assignments
        .iter()
        .map(|(column, value)| (column.as_str(), value.as_str()))
        .collect()
}
