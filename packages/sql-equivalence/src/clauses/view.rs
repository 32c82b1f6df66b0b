use crate::comparison::ComparisonResult;
use crate::diff::SelectStatementInfo;
use crate::tree::NodeRef;

/// Canonical CREATE VIEW statement: the view name and its defining query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewInfo {
    pub name: String,
    pub query: Option<SelectStatementInfo>,
}

impl ViewInfo {
    pub fn extract(stmt: NodeRef<'_>) -> Self {
        Self {
            name: stmt
                .child("view")
                .and_then(|view| view.value_of("relname"))
                .unwrap_or_default()
                .to_string(),
            query: stmt
                .child("query")
                .and_then(|query| query.child("SelectStmt"))
                .map(SelectStatementInfo::extract),
        }
    }

    pub fn compare(&self, candidate: &ViewInfo) -> ComparisonResult {
        let mut result = ComparisonResult::default();

        let same_name = result.check("View name", self.name == candidate.name, || {
            format!(
                "The view name should be '{}', but found '{}'.",
                self.name, candidate.name
            )
        });
        if !same_name {
            result.add_hint(format!("Change the view name to '{}'.", self.name));
        }

        match (&self.query, &candidate.query) {
            (Some(expected), Some(found)) => {
                let query = expected.compare(found);
                if !query.is_equal() && !query.is_both_absent() {
                    result.add_explanation("The SELECT in the view definition does not match.");
                }
                result.absorb("View query", query);
            }
            (Some(_), None) => {
                result.record_mismatch("View query", "The view definition has no SELECT query.");
                result.add_hint("Define the view with a SELECT query.");
            }
            (None, Some(_)) => {
                result.record_mismatch(
                    "View query",
                    "Unexpected query form in the view definition.",
                );
            }
            (None, None) => {}
        }

        result.finish()
    }
}
