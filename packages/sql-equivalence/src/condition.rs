//! Boolean conditions (WHERE, HAVING, JOIN ON, CHECK) in a canonical, comparable form.
//!
//! A [`ConditionNode`] is built once from an expression subtree. Its [`signature`] is a
//! string that is identical for conditions that differ only in the order of AND/OR
//! operands, the order of commutative comparison operands, or a `literal < column` flip.
//! The comparison is textual: `1.0` and `1` are different constants. A condition that
//! holds an expression the renderer does not recognize becomes [`ConditionNode::Unknown`].
//!
//! [`signature`]: ConditionNode::signature

use std::fmt::{self, Display};

use tracing::debug;

use crate::clauses::{
    last_name, null_test, ExprContext, ExprKind, OperatorExpr, SUBQUERY, UNKNOWN_EXPRESSION,
};
use crate::comparison::{diff_multisets, MultisetDiff};
use crate::log::CONDITION;
use crate::tree::NodeRef;
use crate::Fmt;

const COMMUTATIVE: &[&str] = &["=", "<>", "!="];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionNode {
    Simple {
        left: String,
        op: String,
        right: String,
    },
    And(Vec<ConditionNode>),
    Or(Vec<ConditionNode>),
    Not(Box<ConditionNode>),
    /// Rendered text of a condition with an unrecognized part. Never equivalent to anything.
    Unknown(String),
}

impl ConditionNode {
    pub fn simple(
        left: impl Into<String>,
        op: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        ConditionNode::Simple {
            left: left.into(),
            op: op.into(),
            right: right.into(),
        }
    }

    /// Builds the condition wrapped by a clause node such as `whereClause` or `quals`.
    pub fn from_clause(ctx: &ExprContext<'_>, clause: Option<NodeRef<'_>>) -> Option<Self> {
        clause
            .and_then(|clause| clause.first_child())
            .map(|expr| Self::from_expr(ctx, expr))
    }

    pub fn from_expr(ctx: &ExprContext<'_>, node: NodeRef<'_>) -> Self {
        match ExprKind::of(node) {
            ExprKind::BoolExpr => Self::from_bool_expr(ctx, node),
            ExprKind::AExpr if node.value_of("kind") == Some("AEXPR_NOT") => {
                match node.child("rexpr").and_then(|r| r.first_child()) {
                    Some(operand) => ConditionNode::Not(Box::new(Self::from_expr(ctx, operand))),
                    None => Self::unknown(ctx, node),
                }
            }
            _ => {
                let (condition, unrecognized) = ctx.checked(|| Self::from_leaf(ctx, node));
                if unrecognized {
                    debug!(target: CONDITION, path = node.path(), "Unrecognized condition shape");
                    ConditionNode::Unknown(condition.to_string())
                } else {
                    condition
                }
            }
        }
    }

    fn from_leaf(ctx: &ExprContext<'_>, node: NodeRef<'_>) -> Self {
        match ExprKind::of(node) {
            ExprKind::AExpr => match ctx.operator_expr(node) {
                Some(OperatorExpr { left, op, right }) => ConditionNode::Simple { left, op, right },
                None => ConditionNode::simple(ctx.unknown(node), "", ""),
            },
            ExprKind::NullTest => {
                let arg = ctx.resolve_child(node.child("arg"));
                ConditionNode::simple(arg, null_test(node), "")
            }
            ExprKind::SubLink => Self::from_sublink(ctx, node),
            _ => ConditionNode::simple(ctx.resolve(node), "", ""),
        }
    }

    fn from_bool_expr(ctx: &ExprContext<'_>, node: NodeRef<'_>) -> Self {
        let mut args: Vec<ConditionNode> = node
            .child("args")
            .map(|args| args.children().map(|arg| Self::from_expr(ctx, arg)).collect())
            .unwrap_or_default();

        match node.value_of("boolop") {
            Some("AND_EXPR") => ConditionNode::And(args),
            Some("OR_EXPR") => ConditionNode::Or(args),
            Some("NOT_EXPR") if args.len() == 1 => ConditionNode::Not(Box::new(args.remove(0))),
            _ => Self::unknown(ctx, node),
        }
    }

    fn from_sublink(ctx: &ExprContext<'_>, node: NodeRef<'_>) -> Self {
        let testexpr = || ctx.resolve_child(node.child("testexpr"));

        match node.value_of("subLinkType") {
            Some("EXISTS_SUBLINK") => ConditionNode::simple("EXISTS", "", SUBQUERY),
            Some(kind @ ("ANY_SUBLINK" | "ALL_SUBLINK")) => {
                let op = last_name(node.child("operName")).unwrap_or("=");
                let quantifier = if kind == "ANY_SUBLINK" { "ANY" } else { "ALL" };
                ConditionNode::simple(testexpr(), format!("{op} {quantifier}"), SUBQUERY)
            }
            Some("EXPR_SUBLINK") => {
                let left = match node.child("testexpr") {
                    Some(_) => testexpr(),
                    None => String::new(),
                };
                ConditionNode::simple(left, "=", SUBQUERY)
            }
            _ => ConditionNode::simple(SUBQUERY, "", ""),
        }
    }

    fn unknown(ctx: &ExprContext<'_>, node: NodeRef<'_>) -> Self {
        debug!(target: CONDITION, path = node.path(), "Unrecognized condition shape");
        ConditionNode::Unknown(ctx.unknown(node))
    }

    /// Stands in for a condition that is missing where one is required.
    pub fn unrecognized() -> Self {
        ConditionNode::Unknown(UNKNOWN_EXPRESSION.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConditionNode::Simple { .. } => "SIMPLE",
            ConditionNode::And(_) => "AND",
            ConditionNode::Or(_) => "OR",
            ConditionNode::Not(_) => "NOT",
            ConditionNode::Unknown(_) => "UNKNOWN",
        }
    }

    pub fn contains_unknown(&self) -> bool {
        match self {
            ConditionNode::Simple { .. } => false,
            ConditionNode::And(children) | ConditionNode::Or(children) => {
                children.iter().any(ConditionNode::contains_unknown)
            }
            ConditionNode::Not(child) => child.contains_unknown(),
            ConditionNode::Unknown(_) => true,
        }
    }

    /// Canonical text of the condition. Equal signatures mean equal conditions up to operand
    /// order of AND, OR and commutative operators.
    pub fn signature(&self) -> String {
        match self {
            ConditionNode::Simple { left, op, right } => {
                let (left, op, right) = normalize(left, op, right);
                format!("SIMPLE:{left}{op}{right}")
            }
            ConditionNode::And(children) => format!("AND:{}", joined_signatures(children)),
            ConditionNode::Or(children) => format!("OR:{}", joined_signatures(children)),
            ConditionNode::Not(child) => format!("NOT:{}", child.signature()),
            ConditionNode::Unknown(text) => format!("UNKNOWN:{text}"),
        }
    }

    pub fn equivalent(&self, other: &ConditionNode) -> bool {
        compare_conditions(self, other).is_ok()
    }
}

/// Compares a candidate condition against a reference, naming the first difference found.
///
/// Conditions holding an unrecognized expression are never equivalent, not even to
/// themselves.
pub fn compare_conditions(
    reference: &ConditionNode,
    candidate: &ConditionNode,
) -> Result<(), ConditionMismatch> {
    if reference.contains_unknown() || candidate.contains_unknown() {
        return Err(ConditionMismatch::UnknownExpression);
    }

    match (reference, candidate) {
        (
            ConditionNode::Simple { left, op, right },
            ConditionNode::Simple {
                left: other_left,
                op: other_op,
                right: other_right,
            },
        ) => {
            let expected = normalize(left, op, right);
            let found = normalize(other_left, other_op, other_right);

            if expected.1 != found.1 {
                return Err(ConditionMismatch::Operator {
                    expected: expected.1.to_string(),
                    found: found.1.to_string(),
                });
            }

            // Commutative operands are already sorted by `normalize`
            if expected.0 != found.0 || expected.2 != found.2 {
                return Err(ConditionMismatch::Operands {
                    expected: reference.to_string(),
                    found: candidate.to_string(),
                });
            }

            Ok(())
        }
        (ConditionNode::And(expected), ConditionNode::And(found))
        | (ConditionNode::Or(expected), ConditionNode::Or(found)) => {
            if expected.len() != found.len() {
                return Err(ConditionMismatch::ChildCount {
                    kind: reference.kind(),
                    expected: expected.len(),
                    found: found.len(),
                });
            }

            let diff = diff_multisets(&signatures(expected), &signatures(found));
            if diff.is_empty() {
                Ok(())
            } else {
                Err(ConditionMismatch::Children {
                    kind: reference.kind(),
                    diff,
                })
            }
        }
        (ConditionNode::Not(expected), ConditionNode::Not(found)) => {
            compare_conditions(expected, found)
        }
        _ => Err(ConditionMismatch::NodeType {
            expected: reference.kind(),
            found: candidate.kind(),
        }),
    }
}

/// Why two conditions are not equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionMismatch {
    NodeType {
        expected: &'static str,
        found: &'static str,
    },
    Operator {
        expected: String,
        found: String,
    },
    Operands {
        expected: String,
        found: String,
    },
    ChildCount {
        kind: &'static str,
        expected: usize,
        found: usize,
    },
    Children {
        kind: &'static str,
        diff: MultisetDiff,
    },
    UnknownExpression,
}

impl Display for ConditionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionMismatch::NodeType { expected, found } => {
                write!(f, "Expected a {expected} condition but found {found}")
            }
            ConditionMismatch::Operator { expected, found } => {
                write!(f, "Expected operator '{expected}' but found '{found}'")
            }
            ConditionMismatch::Operands { expected, found } => {
                write!(f, "Expected '{expected}' but found '{found}'")
            }
            ConditionMismatch::ChildCount {
                kind,
                expected,
                found,
            } => write!(f, "{kind} condition has {found} operands, expected {expected}"),
            ConditionMismatch::Children { kind, diff } => {
                write!(f, "{kind} operands differ")?;
                if !diff.missing.is_empty() {
                    write!(f, ". Missing: {}", Fmt(&diff.missing))?;
                }
                if !diff.extra.is_empty() {
                    write!(f, ". Extra: {}", Fmt(&diff.extra))?;
                }
                Ok(())
            }
            ConditionMismatch::UnknownExpression => {
                f.write_str("Condition contains an expression that could not be recognized")
            }
        }
    }
}

impl Display for ConditionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionNode::Simple { left, op, right } => match (op.is_empty(), right.is_empty()) {
                (true, true) => f.write_str(left),
                (false, true) => write!(f, "{left} {op}"),
                (true, false) => write!(f, "{left} {right}"),
                (false, false) if left.is_empty() => write!(f, "{op} {right}"),
                (false, false) => write!(f, "{left} {op} {right}"),
            },
            ConditionNode::And(children) => write_joined(f, children, " and "),
            ConditionNode::Or(children) => write_joined(f, children, " or "),
            ConditionNode::Not(child) => write!(f, "not ({child})"),
            ConditionNode::Unknown(text) => f.write_str(text),
        }
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    children: &[ConditionNode],
    separator: &str,
) -> fmt::Result {
    let parts: Vec<String> = children.iter().map(ToString::to_string).collect();
    write!(f, "({})", parts.join(separator))
}

fn signatures(children: &[ConditionNode]) -> Vec<String> {
    children.iter().map(ConditionNode::signature).collect()
}

fn joined_signatures(children: &[ConditionNode]) -> String {
    let mut sigs = signatures(children);
    sigs.sort();
    sigs.iter().map(|sig| format!("{sig};")).collect()
}

/// Puts a comparison into canonical operand order.
///
/// `5 < age` becomes `age > 5`, and the operands of `=`, `<>` and `!=` are sorted.
fn normalize<'a>(left: &'a str, op: &'a str, right: &'a str) -> (&'a str, &'a str, &'a str) {
    let (mut left, mut op, mut right) = (left, op, right);

    if let Some(flipped) = flip(op) {
        if looks_literal(left) && looks_identifier(right) {
            std::mem::swap(&mut left, &mut right);
            op = flipped;
        }
    }

    if COMMUTATIVE.contains(&op) && right < left {
        std::mem::swap(&mut left, &mut right);
    }

    (left, op, right)
}

fn flip(op: &str) -> Option<&'static str> {
    match op {
        "<" => Some(">"),
        ">" => Some("<"),
        "<=" => Some(">="),
        ">=" => Some("<="),
        _ => None,
    }
}

fn looks_literal(operand: &str) -> bool {
    operand
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '\'' || c == '"')
}

fn looks_identifier(operand: &str) -> bool {
    operand
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::*;
    use crate::test_helpers::{null_test_expr, trace};
    use crate::tree::Tree;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn condition(expr: Value) -> ConditionNode {
        let tree = Tree::from_json(&json!({ "whereClause": expr }));
        ConditionNode::from_clause(&ExprContext::default(), tree.root().child("whereClause"))
            .unwrap()
    }

    fn eq(left: &str, right: &str) -> ConditionNode {
        ConditionNode::simple(left, "=", right)
    }

    #[test]
    fn and_or_signatures_ignore_operand_order() {
        let a = ConditionNode::And(vec![eq("title", "Star Wars"), eq("album", "my album")]);
        let b = ConditionNode::And(vec![eq("album", "my album"), eq("title", "Star Wars")]);

        assert_eq!(a.signature(), b.signature());
        assert!(a.equivalent(&b));

        let c = ConditionNode::Or(vec![eq("x", "1"), a.clone(), eq("y", "2")]);
        let d = ConditionNode::Or(vec![b, eq("y", "2"), eq("x", "1")]);
        assert_eq!(c.signature(), d.signature());
    }

    #[test]
    fn commutative_operands_are_sorted() {
        for op in ["=", "<>", "!="] {
            assert_eq!(
                ConditionNode::simple("a", op, "b").signature(),
                ConditionNode::simple("b", op, "a").signature()
            );
        }
        assert_ne!(
            ConditionNode::simple("a", "-", "b").signature(),
            ConditionNode::simple("b", "-", "a").signature()
        );
    }

    #[test]
    fn literal_on_the_left_is_flipped() {
        let flipped = ConditionNode::simple("5", "<", "age");
        let plain = ConditionNode::simple("age", ">", "5");

        assert_eq!(flipped.signature(), plain.signature());
        assert_eq!(plain.signature(), "SIMPLE:age>5");
        assert!(flipped.equivalent(&plain));
    }

    #[test]
    fn signature_layout() {
        let c = ConditionNode::Not(Box::new(ConditionNode::And(vec![
            eq("b", "2"),
            eq("a", "1"),
        ])));

        assert_eq!(c.signature(), "NOT:AND:SIMPLE:1=a;SIMPLE:2=b;");
    }

    #[test]
    fn mismatches_name_the_difference() {
        let result = compare_conditions(
            &ConditionNode::simple("age", ">", "5"),
            &ConditionNode::simple("age", ">=", "5"),
        );
        assert_eq!(
            result,
            Err(ConditionMismatch::Operator {
                expected: ">".into(),
                found: ">=".into()
            })
        );

        let result = compare_conditions(
            &ConditionNode::And(vec![eq("a", "1"), eq("b", "2")]),
            &ConditionNode::And(vec![eq("a", "1")]),
        );
        assert_eq!(
            result.unwrap_err().to_string(),
            "AND condition has 1 operands, expected 2"
        );

        let result = compare_conditions(
            &ConditionNode::And(vec![eq("a", "1")]),
            &ConditionNode::Or(vec![eq("a", "1")]),
        );
        assert_eq!(
            result,
            Err(ConditionMismatch::NodeType {
                expected: "AND",
                found: "OR"
            })
        );
    }

    #[test]
    fn unknown_expressions_are_never_equivalent() {
        let unknown = ConditionNode::unrecognized();

        assert!(!unknown.equivalent(&unknown.clone()));
        assert_eq!(
            compare_conditions(&unknown, &unknown),
            Err(ConditionMismatch::UnknownExpression)
        );

        let built = condition(and(vec![
            op_expr(col(&["a"]), "=", int(1)),
            op_expr(json!({ "XmlExpr": { "op": "IS_XMLPARSE" } }), "=", int(2)),
        ]));
        assert_eq!(
            built,
            ConditionNode::And(vec![
                eq("a", "1"),
                ConditionNode::Unknown(format!("{UNKNOWN_EXPRESSION} = 2")),
            ])
        );
        assert!(!built.equivalent(&built.clone()));
    }

    #[test]
    fn unrecognized_shapes_are_logged_with_their_path() {
        let (writer, _guard) = trace();

        condition(op_expr(json!({ "XmlExpr": { "op": "IS_XMLPARSE" } }), "=", int(2)));

        let log_contents = writer.get_string();
        assert!(log_contents.contains("extract:"));
        assert!(log_contents.contains("Unrecognized expression"));
        assert!(log_contents.contains("condition:"));
        assert!(log_contents.contains("Unrecognized condition shape"));
        assert!(log_contents.contains("root/whereClause/A_Expr"));
    }

    #[test]
    fn literal_spelling_the_placeholder_compares_equal() {
        let built = condition(op_expr(col(&["note"]), "=", string(UNKNOWN_EXPRESSION)));

        assert_eq!(built, eq("note", UNKNOWN_EXPRESSION));
        assert!(!built.contains_unknown());
        assert!(built.equivalent(&built.clone()));
    }

    #[test]
    fn builds_from_parser_shapes() {
        let built = condition(and(vec![
            op_expr(col(&["title"]), "=", string("Star Wars")),
            null_test_expr(col(&["album"]), true),
            not(in_list(col(&["id"]), vec![int(1), int(2)], true)),
        ]));

        assert_eq!(
            built,
            ConditionNode::And(vec![
                eq("title", "Star Wars"),
                ConditionNode::simple("album", "IS NOT NULL", ""),
                ConditionNode::Not(Box::new(ConditionNode::simple("id", "NOT IN", "(1, 2)"))),
            ])
        );
        assert_eq!(
            built.to_string(),
            "(title = Star Wars and album IS NOT NULL and not (id NOT IN (1, 2)))"
        );
    }

    #[test]
    fn between_and_like_shapes() {
        let between = condition(json!({ "A_Expr": {
            "kind": "AEXPR_BETWEEN",
            "name": [{ "String": { "sval": "BETWEEN" } }],
            "lexpr": col(&["price"]),
            "rexpr": { "List": { "items": [int(10), int(20)] } }
        } }));
        assert_eq!(between, ConditionNode::simple("price", "BETWEEN", "10 AND 20"));

        let like = condition(json!({ "A_Expr": {
            "kind": "AEXPR_LIKE",
            "name": [{ "String": { "sval": "!~~" } }],
            "lexpr": col(&["name"]),
            "rexpr": string("A%")
        } }));
        assert_eq!(like, ConditionNode::simple("name", "NOT LIKE", "A%"));
    }

    #[test]
    fn sublinks_render_as_subquery() {
        let exists = condition(json!({ "SubLink": {
            "subLinkType": "EXISTS_SUBLINK",
            "subselect": select(vec![res_target(int(1), None)], vec![])
        } }));
        assert_eq!(exists, ConditionNode::simple("EXISTS", "", SUBQUERY));

        let any = condition(json!({ "SubLink": {
            "subLinkType": "ANY_SUBLINK",
            "testexpr": col(&["id"]),
            "subselect": select(vec![res_target(col(&["id"]), None)], vec![])
        } }));
        assert_eq!(any, ConditionNode::simple("id", "= ANY", SUBQUERY));
    }

    #[test]
    fn bare_boolean_expression_is_simple() {
        let built = condition(col(&["active"]));

        assert_eq!(built, ConditionNode::simple("active", "", ""));
        assert_eq!(built.to_string(), "active");
    }
}
