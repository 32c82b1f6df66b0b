#[cfg(test)]
mod tests {
    use crate::common::*;
    use serde_json::json;
    use sql_equivalence::{compare_queries, Equality, Tree};

    fn script() -> Vec<serde_json::Value> {
        vec![
            create_table("t", vec![column_def("id", "int4", true)]),
            insert("t", &["id"], vec![vec![int(1)]]),
            select(vec![target(col(&["id"]))], vec![range_var("t", None)]),
        ]
    }

    #[test]
    fn statements_pair_by_kind() {
        trace();

        let reference = document(script());
        let mut reordered = script();
        reordered.reverse();
        let candidate = document(reordered);

        let result = compare_queries(&reference, &candidate);

        assert_eq!(result.equality, Equality::Equal);
        assert!(result.is_matched("Column names"));
        assert!(result.is_matched("SELECT clause"));
        assert!(result.is_matched("Row 1, column 1"));
    }

    #[test]
    fn missing_and_extra_statements() {
        trace();

        let reference = document(script());
        let mut statements = script();
        statements.remove(1);
        statements.push(json!({ "TruncateStmt": {
            "relations": [{ "RangeVar": relation("t") }],
            "behavior": "DROP_RESTRICT"
        } }));
        let candidate = document(statements);

        let result = compare_queries(&reference, &candidate);

        assert_eq!(result.equality, Equality::Unequal);
        assert_eq!(result.mismatched, vec!["INSERT statement", "Extra TruncateStmt"]);
        assert_eq!(
            result.explanation,
            vec!["Missing INSERT statement.", "Extra TruncateStmt statement."]
        );
    }

    #[test]
    fn other_statements_compare_structurally() {
        trace();

        let truncate = |table: &str| {
            document(vec![json!({ "TruncateStmt": {
                "relations": [{ "RangeVar": relation(table) }],
                "behavior": "DROP_RESTRICT"
            } })])
        };

        assert!(compare_queries(&truncate("t"), &truncate("t")).is_equal());

        let result = compare_queries(&truncate("t"), &truncate("u"));
        assert_eq!(result.mismatched, vec!["TruncateStmt statement"]);
        assert_eq!(
            result.explanation,
            vec!["The TruncateStmt statement differs from the reference (edit distance 1)."]
        );
    }

    #[test]
    fn empty_documents_are_both_absent() {
        let empty = Tree::from_json(&json!({ "version": 170004, "stmts": [] }));

        let result = compare_queries(&empty, &empty);

        assert!(result.is_both_absent());
        assert!(result.matched.is_empty() && result.mismatched.is_empty());
    }
}
