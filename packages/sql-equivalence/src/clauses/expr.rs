//! Renders expression subtrees to canonical text.
//!
//! Rendering never fails. Shapes that are not recognized render as [`UNKNOWN_EXPRESSION`]
//! and are flagged on the [`ExprContext`], so comparators can treat them as different from
//! everything, including themselves. A literal that happens to spell the placeholder is
//! not flagged.

use std::cell::Cell;

use tracing::debug;

use super::{SelectItem, TableRef};
use crate::log::EXTRACT;
use crate::tree::NodeRef;

pub const UNKNOWN_EXPRESSION: &str = "(unknown expression)";
pub const SUBQUERY: &str = "(subquery)";

/// Expression node kinds understood by the resolver, classified from the node key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    ColumnRef,
    Const,
    FuncCall,
    AExpr,
    BoolExpr,
    TypeCast,
    Collate,
    SubLink,
    NullTest,
    ParamRef,
    SetToDefault,
    List,
    Unknown,
}

impl ExprKind {
    pub fn of(node: NodeRef<'_>) -> Self {
        match node.key() {
            "ColumnRef" => ExprKind::ColumnRef,
            "A_Const" => ExprKind::Const,
            "FuncCall" => ExprKind::FuncCall,
            "A_Expr" => ExprKind::AExpr,
            "BoolExpr" => ExprKind::BoolExpr,
            "TypeCast" => ExprKind::TypeCast,
            "CollateClause" => ExprKind::Collate,
            "SubLink" => ExprKind::SubLink,
            "NullTest" => ExprKind::NullTest,
            "ParamRef" => ExprKind::ParamRef,
            "SetToDefault" => ExprKind::SetToDefault,
            "List" => ExprKind::List,
            _ => ExprKind::Unknown,
        }
    }
}

/// Operator and operands of an `A_Expr`, already rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorExpr {
    pub left: String,
    pub op: String,
    pub right: String,
}

/// Tables (for alias resolution) and select items (for output-alias replacement) visible
/// to the expressions of one statement.
///
/// The context also records whether anything rendered through it was unrecognized. Use
/// [`checked`](Self::checked) to read that for one rendering.
#[derive(Debug, Clone, Default)]
pub struct ExprContext<'a> {
    tables: &'a [TableRef],
    select: &'a [SelectItem],
    unrecognized: Cell<bool>,
}

impl<'a> ExprContext<'a> {
    pub fn new(tables: &'a [TableRef]) -> Self {
        Self {
            tables,
            select: &[],
            unrecognized: Cell::new(false),
        }
    }

    /// Bare column names equal to one of these items' aliases render as the item itself.
    pub fn with_select(self, select: &'a [SelectItem]) -> Self {
        Self { select, ..self }
    }

    /// Runs `render` and reports whether it met an unrecognized shape. Nested calls also
    /// mark the enclosing one.
    pub fn checked<T>(&self, render: impl FnOnce() -> T) -> (T, bool) {
        let outer = self.unrecognized.replace(false);
        let rendered = render();
        let inner = self.unrecognized.get();
        self.unrecognized.set(outer || inner);
        (rendered, inner)
    }

    /// Resolves `node`, returning the text and whether any part of it was unrecognized.
    pub fn resolve_checked(&self, node: NodeRef<'_>) -> (String, bool) {
        self.checked(|| self.resolve(node))
    }

    pub fn resolve(&self, node: NodeRef<'_>) -> String {
        match ExprKind::of(node) {
            ExprKind::ColumnRef => self.column_ref(node),
            ExprKind::Const => constant(node).unwrap_or_else(|| self.unknown(node)),
            ExprKind::FuncCall => self.func_call(node),
            ExprKind::AExpr => match self.operator_expr(node) {
                Some(OperatorExpr { left, op, right }) if left.is_empty() => {
                    format!("({op} {right})")
                }
                Some(OperatorExpr { left, op, right }) => format!("({left} {op} {right})"),
                None => self.unknown(node),
            },
            ExprKind::BoolExpr => self.bool_expr(node),
            ExprKind::TypeCast => {
                let arg = self.resolve_child(node.child("arg"));
                let type_name = node
                    .child("typeName")
                    .and_then(|t| last_name(t.child("names")))
                    .unwrap_or_default();
                format!("{arg}::{type_name}")
            }
            ExprKind::Collate => {
                let arg = self.resolve_child(node.child("arg"));
                let collation = names(node.child("collname")).join(".");
                format!("{arg} COLLATE \"{collation}\"")
            }
            ExprKind::SubLink => SUBQUERY.to_string(),
            ExprKind::NullTest => {
                let arg = self.resolve_child(node.child("arg"));
                format!("{arg} {}", null_test(node))
            }
            ExprKind::ParamRef => format!("${}", node.value_of("number").unwrap_or("0")),
            ExprKind::SetToDefault => "DEFAULT".to_string(),
            ExprKind::List => {
                let items = node.child("items").unwrap_or(node);
                format!("({})", self.resolve_all(items).join(", "))
            }
            ExprKind::Unknown => self.unknown(node),
        }
    }

    /// Resolves the expression wrapped by a holder node such as `val`, `arg` or `lexpr`.
    pub fn resolve_child(&self, holder: Option<NodeRef<'_>>) -> String {
        match holder.and_then(|h| h.first_child()) {
            Some(expr) => self.resolve(expr),
            None => {
                if let Some(holder) = holder {
                    debug!(target: EXTRACT, path = holder.path(), "Empty expression holder");
                }
                self.unrecognized.set(true);
                UNKNOWN_EXPRESSION.to_string()
            }
        }
    }

    pub fn resolve_all(&self, list: NodeRef<'_>) -> Vec<String> {
        list.children().map(|item| self.resolve(item)).collect()
    }

    /// Full name of the table a qualifier refers to, matching aliases first.
    pub fn table_for(&self, qualifier: &str) -> String {
        self.tables
            .iter()
            .find(|table| table.alias.as_deref() == Some(qualifier))
            .map(|table| table.name.clone())
            .unwrap_or_else(|| qualifier.to_string())
    }

    pub fn column_ref(&self, node: NodeRef<'_>) -> String {
        let fields: Vec<String> = node
            .child("fields")
            .map(|fields| {
                fields
                    .children()
                    .filter_map(|field| match field.key() {
                        "String" => field.value_of("sval").map(str::to_string),
                        "A_Star" => Some("*".to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        match fields.as_slice() {
            [] => self.unknown(node),
            [column] => self.output_alias(column).unwrap_or_else(|| column.clone()),
            [qualifier, column] => format!("{}.{column}", self.table_for(qualifier)),
            parts => parts.join("."),
        }
    }

    fn output_alias(&self, name: &str) -> Option<String> {
        let item = self
            .select
            .iter()
            .find(|item| item.alias.as_deref() == Some(name))?;
        if item.unrecognized {
            self.unrecognized.set(true);
        }
        Some(item.text.clone())
    }

    fn func_call(&self, node: NodeRef<'_>) -> String {
        let name = last_name(node.child("funcname")).unwrap_or_default();

        if node.value_of("agg_star") == Some("true") {
            return format!("{name}(*)");
        }

        let args = node
            .child("args")
            .map(|args| self.resolve_all(args))
            .unwrap_or_default()
            .join(", ");

        if node.value_of("agg_distinct") == Some("true") {
            format!("{name}(DISTINCT {args})")
        } else {
            format!("{name}({args})")
        }
    }

    fn bool_expr(&self, node: NodeRef<'_>) -> String {
        let args = node
            .child("args")
            .map(|args| self.resolve_all(args))
            .unwrap_or_default();

        match node.value_of("boolop") {
            Some("NOT_EXPR") => format!("(not {})", args.join(" ")),
            Some("OR_EXPR") => format!("({})", args.join(" or ")),
            Some("AND_EXPR") => format!("({})", args.join(" and ")),
            _ => self.unknown(node),
        }
    }

    /// Splits an `A_Expr` into its rendered operator and operands.
    ///
    /// `IN` lists render as `(a, b)` and `BETWEEN` bounds as `lo AND hi`. Returns `None` for
    /// expression kinds without a binary reading.
    pub fn operator_expr(&self, node: NodeRef<'_>) -> Option<OperatorExpr> {
        let name = last_name(node.child("name")).unwrap_or_default();
        let lexpr = node.child("lexpr");
        let rexpr = node.child("rexpr");
        let left = match lexpr {
            Some(_) => self.resolve_child(lexpr),
            None => String::new(),
        };

        let (op, right) = match node.value_of("kind").unwrap_or("AEXPR_OP") {
            "AEXPR_OP" => (name.to_string(), self.resolve_child(rexpr)),
            "AEXPR_OP_ANY" => (format!("{name} ANY"), self.resolve_child(rexpr)),
            "AEXPR_OP_ALL" => (format!("{name} ALL"), self.resolve_child(rexpr)),
            "AEXPR_DISTINCT" => ("IS DISTINCT FROM".to_string(), self.resolve_child(rexpr)),
            "AEXPR_NOT_DISTINCT" => ("IS NOT DISTINCT FROM".to_string(), self.resolve_child(rexpr)),
            "AEXPR_NULLIF" => ("NULLIF".to_string(), self.resolve_child(rexpr)),
            "AEXPR_IN" => {
                let op = if name == "<>" { "NOT IN" } else { "IN" };
                (op.to_string(), format!("({})", self.list_operand(rexpr).join(", ")))
            }
            "AEXPR_LIKE" => (negated("LIKE", name == "!~~"), self.resolve_child(rexpr)),
            "AEXPR_ILIKE" => (negated("ILIKE", name == "!~~*"), self.resolve_child(rexpr)),
            "AEXPR_SIMILAR" => (negated("SIMILAR TO", name == "!~"), self.resolve_child(rexpr)),
            kind @ ("AEXPR_BETWEEN" | "AEXPR_NOT_BETWEEN" | "AEXPR_BETWEEN_SYM"
            | "AEXPR_NOT_BETWEEN_SYM") => {
                let op = negated("BETWEEN", kind.starts_with("AEXPR_NOT"));
                (op, self.between_bounds(node, rexpr))
            }
            _ => return None,
        };

        Some(OperatorExpr { left, op, right })
    }

    fn list_operand(&self, rexpr: Option<NodeRef<'_>>) -> Vec<String> {
        let Some(rexpr) = rexpr else {
            return Vec::new();
        };

        match rexpr.first_child() {
            Some(list) if list.key() == "List" => list
                .child("items")
                .map(|items| self.resolve_all(items))
                .unwrap_or_default(),
            Some(array) if array.key() == "A_ArrayExpr" => array
                .child("elements")
                .map(|elements| self.resolve_all(elements))
                .unwrap_or_default(),
            _ => self.resolve_all(rexpr),
        }
    }

    fn between_bounds(&self, node: NodeRef<'_>, rexpr: Option<NodeRef<'_>>) -> String {
        let bounds = match (node.child("lower"), node.child("upper")) {
            (Some(lower), Some(upper)) => {
                vec![self.resolve_child(Some(lower)), self.resolve_child(Some(upper))]
            }
            _ => self.list_operand(rexpr),
        };
        bounds.join(" AND ")
    }

    pub(crate) fn unknown(&self, node: NodeRef<'_>) -> String {
        debug!(target: EXTRACT, path = node.path(), key = node.key(), "Unrecognized expression");
        self.unrecognized.set(true);
        UNKNOWN_EXPRESSION.to_string()
    }
}

/// Renders an `A_Const`, or `None` for a constant of unknown shape. The parser omits zero
/// and false values, so an empty `ival` branch is `0` and an empty `boolval` branch is
/// `false`.
pub fn constant(node: NodeRef<'_>) -> Option<String> {
    if node.child("isnull").is_some() {
        return Some("NULL".to_string());
    }

    const VALUES: [(&str, &str); 5] = [
        ("ival", "0"),
        ("fval", "0"),
        ("sval", ""),
        ("boolval", "false"),
        ("bsval", ""),
    ];

    VALUES.iter().find_map(|&(key, zero)| {
        node.child(key)
            .map(|holder| holder.value_of(key).unwrap_or(zero).to_string())
    })
}

/// The `sval` of every `String` child, in order.
pub fn names<'a>(list: Option<NodeRef<'a>>) -> Vec<&'a str> {
    list.map(|list| {
        list.children()
            .filter(|part| part.key() == "String")
            .filter_map(|part| part.value_of("sval"))
            .collect()
    })
    .unwrap_or_default()
}

/// The last `String.sval` of a qualified name such as `pg_catalog.int4`.
pub fn last_name<'a>(list: Option<NodeRef<'a>>) -> Option<&'a str> {
    names(list).last().copied()
}

pub(crate) fn null_test(node: NodeRef<'_>) -> &'static str {
    match node.value_of("nulltesttype") {
        Some("IS_NOT_NULL") => "IS NOT NULL",
        _ => "IS NULL",
    }
}

fn negated(op: &str, negate: bool) -> String {
    if negate {
        format!("NOT {op}")
    } else {
        op.to_string()
    }
}
