#[cfg(test)]
mod tests {
    use crate::common::*;
    use sql_equivalence::{compare_queries, Equality};

    #[test]
    fn assignments_in_any_order() {
        trace();

        let condition = || Some(op(col(&["id"]), "=", int(7)));
        let reference = document(vec![update(
            "employees",
            vec![("salary", int(100)), ("title", string("lead"))],
            condition(),
        )]);
        let candidate = document(vec![update(
            "employees",
            vec![("title", string("lead")), ("salary", int(100))],
            condition(),
        )]);

        let result = compare_queries(&reference, &candidate);

        assert_eq!(result.equality, Equality::Equal);
        assert_eq!(result.matched, vec!["Target table", "Set clauses", "WHERE clause"]);
    }

    #[test]
    fn missing_where_clause() {
        trace();

        let reference = document(vec![update(
            "employees",
            vec![("salary", int(100))],
            Some(op(col(&["id"]), "=", int(7))),
        )]);
        let candidate = document(vec![update("employees", vec![("salary", int(100))], None)]);

        let result = compare_queries(&reference, &candidate);

        assert_eq!(result.mismatched, vec!["WHERE clause"]);
        assert_eq!(result.explanation, vec!["Missing WHERE clause."]);
        assert_eq!(result.hints, vec!["Add a WHERE clause filtering on: id = 7."]);
    }
}
