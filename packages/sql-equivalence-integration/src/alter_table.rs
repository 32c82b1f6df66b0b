#[cfg(test)]
mod tests {
    use crate::common::*;
    use serde_json::json;
    use sql_equivalence::{compare_queries, compare_statements, Equality};

    #[test]
    fn operations_are_compared_by_position() {
        trace();

        let reference = document(vec![alter_table(
            "users",
            vec![add_column("x", "text"), rename_table("y")],
        )]);
        let candidate = document(vec![alter_table(
            "users",
            vec![rename_table("y"), add_column("x", "text")],
        )]);

        let result = compare_statements(reference.root(), candidate.root());

        assert_eq!(result.equality, Equality::Unequal);
        assert!(result.is_matched("Table name"));
        assert!(result.is_matched("Number of operations"));
        assert!(result.is_mismatched("Operation types"));
        assert!(result.is_mismatched("Operation 1"));
        assert!(result.is_mismatched("Operation 2"));
        assert!(result
            .explanation
            .contains(&"Operation 1: expected ADD COLUMN but found RENAME TO.".to_string()));
    }

    #[test]
    fn rename_statement_pairs_with_alter_table() {
        trace();

        let reference = document(vec![alter_table("users", vec![rename_table("customers")])]);
        let candidate = document(vec![json!({ "RenameStmt": {
            "renameType": "OBJECT_TABLE",
            "relationType": "OBJECT_TABLE",
            "relation": relation("users"),
            "newname": "customers",
            "behavior": "DROP_RESTRICT"
        } })]);

        let result = compare_queries(&reference, &candidate);

        assert_eq!(result.equality, Equality::Equal);
        assert!(result.is_matched("Operation 1"));
    }
}
