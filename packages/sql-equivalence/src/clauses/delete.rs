use super::{FilterInfo, FromInfo, SelectInfo, TableRef};
use crate::comparison::ComparisonResult;
use crate::tree::NodeRef;

/// Canonical DELETE statement. `from` holds the `USING` sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteInfo {
    pub table: String,
    pub from: FromInfo,
    pub filter: FilterInfo,
}

impl DeleteInfo {
    pub fn extract(stmt: NodeRef<'_>) -> Self {
        let relation = stmt.child("relation");
        let table = relation
            .and_then(|relation| relation.value_of("relname"))
            .unwrap_or_default()
            .to_string();
        let from = FromInfo::extract(stmt);

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
        let filter = FilterInfo::extract_where(stmt, &scope, &SelectInfo::default());

        Self { table, from, filter }
    }

    pub fn compare(&self, candidate: &DeleteInfo) -> ComparisonResult {
        let mut result = ComparisonResult::default();

        let same_table = result.check("Target table", self.table == candidate.table, || {
            format!(
                "The DELETE statement should target table '{}', but found '{}'.",
                self.table, candidate.table
            )
        });
        if !same_table {
            result.add_hint(format!("Change the target table to '{}'.", self.table));
        }

        let from = self.from.compare(&candidate.from);
        if !from.is_equal() && !from.is_both_absent() {
            result.add_hint("Review and adjust your USING clause.");
        }
        result.absorb("FROM clause", from);
        result.absorb("WHERE clause", self.filter.compare(&candidate.filter));

        result.finish()
    }
}
