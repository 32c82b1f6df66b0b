use derive_more::Display;

use super::{names, ExprContext, FromInfo, SelectInfo};
use crate::comparison::ComparisonResult;
use crate::tree::NodeRef;

/// Placeholder for `ORDER BY n` when `n` is not a valid 1-based select item position.
pub const INVALID_POSITION: &str = "<Invalid Position Reference>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SortDirection {
    #[display("ASC")]
    Asc,
    #[display("DESC")]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NullsOrder {
    #[display("NULLS FIRST")]
    First,
    #[display("NULLS LAST")]
    Last,
}

/// One sort key with its direction and null placement made explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub expression: String,
    pub direction: SortDirection,
    pub nulls: NullsOrder,
    pub collation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderByInfo {
    pub items: Vec<OrderItem>,
}

impl OrderByInfo {
    pub fn extract(stmt: NodeRef<'_>, from: &FromInfo, select: &SelectInfo) -> Self {
        let ctx = ExprContext::new(&from.tables).with_select(&select.items);

        let items = stmt
            .child("sortClause")
            .map(|sort| {
                sort.children()
                    .filter(|sort_by| sort_by.key() == "SortBy")
                    .map(|sort_by| order_item(&ctx, select, sort_by))
                    .collect()
            })
            .unwrap_or_default();

        Self { items }
    }

    pub fn compare(&self, candidate: &OrderByInfo) -> ComparisonResult {
        if self.items.is_empty() && candidate.items.is_empty() {
            return ComparisonResult::both_absent();
        }

        let mut result = ComparisonResult::default();
        let (expected_len, found_len) = (self.items.len(), candidate.items.len());

        let same_count = result.check("Number of ORDER BY items", expected_len == found_len, || {
            format!("Expected {expected_len} ORDER BY items but found {found_len}.")
        });
        if !same_count {
            result.add_hint("Check the number of sort keys in your ORDER BY clause.");
        }

        for (index, (expected, found)) in self.items.iter().zip(&candidate.items).enumerate() {
            let n = index + 1;

            let same_expression = result.check(
                format!("ORDER BY item {n} expression"),
                expected.expression == found.expression,
                || {
                    format!(
                        "ORDER BY item {n}: expected '{}' but found '{}'.",
                        expected.expression, found.expression
                    )
                },
            );
            if !same_expression {
                result.add_hint(format!("Sort by '{}' at position {n}.", expected.expression));
            }

            result.check(
                format!("ORDER BY item {n} direction"),
                expected.direction == found.direction,
                || {
                    format!(
                        "ORDER BY item {n}: expected {} but found {}.",
                        expected.direction, found.direction
                    )
                },
            );

            result.check(
                format!("ORDER BY item {n} nulls order"),
                expected.nulls == found.nulls,
                || {
                    format!(
                        "ORDER BY item {n}: expected {} but found {}.",
                        expected.nulls, found.nulls
                    )
                },
            );

            if expected.collation.is_some() || found.collation.is_some() {
                result.check(
                    format!("ORDER BY item {n} collation"),
                    expected.collation == found.collation,
                    || {
                        format!(
                            "ORDER BY item {n}: expected collation {} but found {}.",
                            crate::Fmt(expected.collation.as_deref()),
                            crate::Fmt(found.collation.as_deref())
                        )
                    },
                );
            }
        }

        for (index, item) in self.items.iter().enumerate().skip(found_len) {
            result.add_explanation(format!(
                "Missing ORDER BY item {}: '{}'.",
                index + 1,
                item.expression
            ));
        }
        for (index, item) in candidate.items.iter().enumerate().skip(expected_len) {
            result.add_explanation(format!(
                "Unexpected ORDER BY item {}: '{}'.",
                index + 1,
                item.expression
            ));
        }

        result.finish()
    }
}

fn order_item(ctx: &ExprContext<'_>, select: &SelectInfo, sort_by: NodeRef<'_>) -> OrderItem {
    let node = sort_by.child("node").and_then(|node| node.first_child());

    let (expression, collation) = match node {
        Some(node) if node.key() == "A_Const" && node.child("ival").is_some() => {
            (position(select, node), None)
        }
        Some(node) if node.key() == "CollateClause" => {
            let collation = names(node.child("collname")).join(".");
            (ctx.resolve_child(node.child("arg")), Some(collation))
        }
        Some(node) => (ctx.resolve(node), None),
        None => (ctx.resolve_child(sort_by.child("node")), None),
    };

    let direction = match sort_by.value_of("sortby_dir") {
        Some("SORTBY_DESC") => SortDirection::Desc,
        _ => SortDirection::Asc,
    };

    let nulls = match (sort_by.value_of("sortby_nulls"), direction) {
        (Some("SORTBY_NULLS_FIRST"), _) => NullsOrder::First,
        (Some("SORTBY_NULLS_LAST"), _) => NullsOrder::Last,
        (_, SortDirection::Asc) => NullsOrder::Last,
        (_, SortDirection::Desc) => NullsOrder::First,
    };

    OrderItem {
        expression,
        direction,
        nulls,
        collation,
    }
}

/// Resolves `ORDER BY n` against the select list, counting every item kind in order.
fn position(select: &SelectInfo, node: NodeRef<'_>) -> String {
    let n = node
        .child("ival")
        .and_then(|ival| ival.value_of("ival"))
        .unwrap_or("0")
        .parse::<usize>()
        .ok();

    n.and_then(|n| n.checked_sub(1))
        .and_then(|index| select.items.get(index))
        .map(|item| item.text.clone())
        .unwrap_or_else(|| INVALID_POSITION.to_string())
}
