use super::{ExprContext, FromInfo};
use crate::comparison::{diff_sets, ComparisonResult};
use crate::tree::NodeRef;
use crate::Fmt;

/// A reference cell holding this value accepts any candidate value.
pub const ANY_VALUE: &str = "*";

/// Canonical INSERT statement. An `INSERT … SELECT` keeps its select list as a single row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertInfo {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub select_insert: bool,
}

impl InsertInfo {
    pub fn extract(stmt: NodeRef<'_>) -> Self {
        let mut info = InsertInfo {
            table: target_table(stmt),
            ..Default::default()
        };

        if let Some(cols) = stmt.child("cols") {
            info.columns = cols
                .children()
                .filter(|col| col.key() == "ResTarget")
                .filter_map(|col| col.value_of("name"))
                .map(str::to_string)
                .collect();
        }

        let Some(select) = stmt
            .child("selectStmt")
            .and_then(|holder| holder.child("SelectStmt"))
        else {
            return info;
        };

        match select.child("valuesLists") {
            Some(values) => {
                let ctx = ExprContext::default();
                info.rows = values
                    .children()
                    .filter(|list| list.key() == "List")
                    .map(|list| {
                        list.child("items")
                            .map(|items| ctx.resolve_all(items))
                            .unwrap_or_default()
                    })
                    .collect();
            }
            None => {
                let from = FromInfo::extract(select);
                let ctx = ExprContext::new(&from.tables);
                let row: Vec<String> = select
                    .child("targetList")
                    .map(|targets| {
                        targets
                            .children()
                            .map(|target| ctx.resolve_child(target.child("val")))
                            .collect()
                    })
                    .unwrap_or_default();

                info.select_insert = true;
                if !row.is_empty() {
                    info.rows.push(row);
                }
            }
        }

        info
    }

    fn style(&self) -> &'static str {
        if self.select_insert {
            "INSERT...SELECT"
        } else {
            "INSERT...VALUES"
        }
    }

    pub fn compare(&self, candidate: &InsertInfo) -> ComparisonResult {
        let mut result = ComparisonResult::default();

        let same_table = result.check("Target table", self.table == candidate.table, || {
            format!(
                "Target table mismatch: expected '{}', but found '{}'.",
                self.table, candidate.table
            )
        });
        if !same_table {
            result.add_hint("Ensure the INSERT targets the correct table.");
        }

        let columns = diff_sets(&self.columns, &candidate.columns);
        if !result.check_diff("Target columns", "columns", &columns) {
            if !columns.missing.is_empty() {
                result.add_hint("Add the missing columns to the INSERT statement.");
            }
            if !columns.extra.is_empty() {
                result.add_hint("Remove the extra columns from the INSERT statement.");
            }
        }

        let same = self.select_insert == candidate.select_insert;
        let same_style = result.check("INSERT style", same, || {
            format!(
                "Mismatch in INSERT style: expected {} but found {}.",
                self.style(),
                candidate.style()
            )
        });
        if !same_style {
            result.add_hint(format!("Use the {} style.", self.style()));
            return result.finish();
        }

        if self.select_insert && (self.rows.is_empty() || candidate.rows.is_empty()) {
            result.record_mismatch("Inserted values", "Could not find values.");
            result.add_hint("Ensure the values are specified.");
            return result.finish();
        }

        self.compare_rows(&mut result, candidate);

        result.finish()
    }

    fn compare_rows(&self, result: &mut ComparisonResult, candidate: &InsertInfo) {
        let (expected_rows, found_rows) = (self.rows.len(), candidate.rows.len());
        let same_rows = result.check("Number of rows", expected_rows == found_rows, || {
            format!("Mismatch in number of rows: expected {expected_rows}, found {found_rows}.")
        });
        if !same_rows {
            result.add_hint("Ensure the correct number of rows are inserted.");
            return;
        }

        let mut all_cells_match = true;

        for (index, (expected, found)) in self.rows.iter().zip(&candidate.rows).enumerate() {
            let row = index + 1;

            if expected.len() != found.len() {
                all_cells_match = false;
                result.record_mismatch(
                    format!("Row {row} values"),
                    format!(
                        "Row {row} has different number of values: expected {}, found {}.",
                        expected.len(),
                        found.len()
                    ),
                );
                if found.len() > expected.len() {
                    let extra = Fmt(&found[expected.len()..]);
                    result.add_explanation(format!("Extra value(s): {extra}."));
                    result.add_hint(format!("Remove the extra value(s) at row {row}."));
                } else {
                    let missing = Fmt(&expected[found.len()..]);
                    result.add_explanation(format!("Missing value(s): {missing}."));
                    result.add_hint(format!("Add the missing value(s) at row {row}."));
                }
                continue;
            }

            for (column, (expected, found)) in expected.iter().zip(found).enumerate() {
                let column = column + 1;
                if expected == ANY_VALUE {
                    result.record_match(format!("Row {row}, column {column} (any)"));
                    continue;
                }

                let part = format!("Row {row}, column {column}");
                let same = result.check(part, expected == found, || {
                    format!(
                        "Mismatch at row {row}, column {column}: expected '{expected}', \
                         found '{found}'."
                    )
                });
                if !same {
                    all_cells_match = false;
                    result.add_hint(format!("Check the value at row {row}, column {column}."));
                }
            }
        }

        if all_cells_match {
            result.record_match("Inserted values");
        }
    }
}

/// `relation.relname`, else the first child keyed like a relation or table.
fn target_table(stmt: NodeRef<'_>) -> String {
    let relation = stmt.child("relation").or_else(|| {
        stmt.children()
            .find(|child| child.key().contains("rel") || child.key().contains("table"))
    });

    let Some(relation) = relation else {
        return String::new();
    };

    relation
        .value_of("relname")
        .or_else(|| {
            relation
                .find(|node| node.key() == "String")
                .and_then(|string| string.value_of("sval"))
        })
        .unwrap_or_default()
        .to_string()
}
