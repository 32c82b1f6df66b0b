use super::{names, ExprContext};
use crate::comparison::ComparisonResult;
use crate::condition::{compare_conditions, ConditionNode};
use crate::tree::NodeRef;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssertionInfo {
    pub name: String,
    pub condition: Option<ConditionNode>,
}

impl AssertionInfo {
    pub fn extract(stmt: NodeRef<'_>) -> Self {
        // The name is either a plain string or a qualified name list
        let name = match stmt.child("assertion_name") {
            Some(name) if name.has_children() => names(Some(name)).join("."),
            Some(name) => name.text().to_string(),
            None => String::new(),
        };

        Self {
            name,
            condition: ConditionNode::from_clause(
                &ExprContext::default(),
                stmt.child("check_expr"),
            ),
        }
    }

    pub fn compare(&self, candidate: &AssertionInfo) -> ComparisonResult {
        let mut result = ComparisonResult::default();

        let same_name = result.check("Assertion name", self.name == candidate.name, || {
            format!(
                "The assertion should be named '{}', but found '{}'.",
                self.name, candidate.name
            )
        });
        if !same_name {
            result.add_hint(format!("Change the assertion name to '{}'.", self.name));
        }

        match (&self.condition, &candidate.condition) {
            (None, None) => {}
            (Some(expected), Some(found)) => match compare_conditions(expected, found) {
                Ok(()) => result.record_match("Assertion condition"),
                Err(mismatch) => {
                    result.record_mismatch(
                        "Assertion condition",
                        format!("The assertion condition does not match: {mismatch}."),
                    );
                    result.add_hint(format!("The assertion should check: {expected}."));
                }
            },
            (Some(expected), None) => {
                result.record_mismatch("Assertion condition", "Missing assertion condition.");
                result.add_hint(format!("The assertion should check: {expected}."));
            }
            (None, Some(_)) => {
                result.record_mismatch("Assertion condition", "Unexpected assertion condition.");
            }
        }

        result.finish()
    }
}
