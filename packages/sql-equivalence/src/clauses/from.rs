use derive_more::Display;
use tracing::debug;

use super::{ExprContext, SUBQUERY};
use crate::comparison::{diff_multisets, diff_sets, ComparisonResult};
use crate::condition::{compare_conditions, ConditionNode};
use crate::log::EXTRACT;
use crate::tree::NodeRef;
use crate::Fmt;

pub const NESTED_JOIN: &str = "(nested join)";
pub const FUNCTION_SOURCE: &str = "(function)";

/// A table source and the alias it was given, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>, alias: Option<&str>) -> Self {
        Self {
            name: name.into(),
            alias: alias.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum JoinType {
    #[display("INNER JOIN")]
    Inner,
    #[display("LEFT JOIN")]
    Left,
    #[display("RIGHT JOIN")]
    Right,
    #[display("FULL JOIN")]
    Full,
    #[display("CROSS JOIN")]
    Cross,
    #[display("{_0}")]
    Other(String),
}

impl JoinType {
    /// True when swapping the two participants does not change the join.
    pub fn is_symmetric(&self) -> bool {
        matches!(self, JoinType::Inner | JoinType::Cross)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub join_type: JoinType,
    pub left: String,
    pub right: String,
    pub condition: Option<ConditionNode>,
    pub natural: bool,
    pub using: Vec<String>,
}

impl JoinSpec {
    pub fn condition_text(&self) -> String {
        self.condition
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

/// Canonical FROM clause: every table source in source order, every join (innermost
/// first) and the names of the statement's common table expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FromInfo {
    pub tables: Vec<TableRef>,
    pub joins: Vec<JoinSpec>,
    pub ctes: Vec<String>,
}

struct PendingJoin<'a> {
    spec: JoinSpec,
    quals: Option<NodeRef<'a>>,
}

impl FromInfo {
    /// Extracts the sources of a `SelectStmt` (`fromClause`), `UpdateStmt` (`fromClause`)
    /// or `DeleteStmt` (`usingClause`). Set operations contribute both arms.
    pub fn extract(stmt: NodeRef<'_>) -> Self {
        let mut info = FromInfo::default();
        let mut pending = Vec::new();

        info.collect(stmt, &mut pending);

        // Join conditions may name tables that appear after the join itself
        let ctx = ExprContext::new(&info.tables);
        let joins: Vec<JoinSpec> = pending
            .into_iter()
            .map(|PendingJoin { mut spec, quals }| {
                spec.condition = ConditionNode::from_clause(&ctx, quals);
                if spec.join_type == JoinType::Inner
                    && spec.condition.is_none()
                    && spec.using.is_empty()
                    && !spec.natural
                {
                    spec.join_type = JoinType::Cross;
                }
                spec
            })
            .collect();
        info.joins = joins;

        info.ctes = stmt
            .child("withClause")
            .and_then(|with| with.child("ctes"))
            .map(|ctes| {
                ctes.children()
                    .filter_map(|cte| cte.value_of("ctename"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        info
    }

    fn collect<'a>(&mut self, stmt: NodeRef<'a>, pending: &mut Vec<PendingJoin<'a>>) {
        let sources = stmt
            .child("fromClause")
            .or_else(|| stmt.child("usingClause"));

        match sources {
            Some(sources) => {
                for source in sources.children() {
                    self.source(source, pending);
                }
            }
            None => {
                for arm in ["larg", "rarg"].iter().filter_map(|key| stmt.child(key)) {
                    self.collect(arm, pending);
                }
            }
        }
    }

    /// Records one source and returns the name it contributes to an enclosing join.
    fn source<'a>(&mut self, node: NodeRef<'a>, pending: &mut Vec<PendingJoin<'a>>) -> String {
        match node.key() {
            "RangeVar" => {
                let name = node.value_of("relname").unwrap_or_default().to_string();
                self.tables.push(TableRef::new(name.clone(), alias_of(node)));
                name
            }
            "JoinExpr" => {
                let left = self.join_arm(node.child("larg"), pending);
                let right = self.join_arm(node.child("rarg"), pending);

                let spec = JoinSpec {
                    join_type: join_type(node.value_of("jointype")),
                    left,
                    right,
                    condition: None,
                    natural: node.value_of("isNatural") == Some("true"),
                    using: node
                        .child("usingClause")
                        .map(|using| {
                            using
                                .children()
                                .filter_map(|name| name.value_of("sval"))
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default(),
                };
                pending.push(PendingJoin {
                    spec,
                    quals: node.child("quals"),
                });

                NESTED_JOIN.to_string()
            }
            "RangeSubselect" => {
                self.tables.push(TableRef::new(SUBQUERY, alias_of(node)));
                SUBQUERY.to_string()
            }
            "RangeFunction" => {
                self.tables.push(TableRef::new(FUNCTION_SOURCE, alias_of(node)));
                FUNCTION_SOURCE.to_string()
            }
            other => {
                debug!(
                    target: EXTRACT,
                    path = node.path(),
                    key = other,
                    "Unrecognized FROM source"
                );
                String::new()
            }
        }
    }

    fn join_arm<'a>(
        &mut self,
        arm: Option<NodeRef<'a>>,
        pending: &mut Vec<PendingJoin<'a>>,
    ) -> String {
        match arm.and_then(|arm| arm.first_child()) {
            Some(source) => self.source(source, pending),
            None => String::new(),
        }
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|table| table.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.ctes.is_empty()
    }

    pub fn compare(&self, candidate: &FromInfo) -> ComparisonResult {
        if self.is_empty() && candidate.is_empty() {
            return ComparisonResult::both_absent();
        }

        let mut result = ComparisonResult::default();

        let tables = diff_multisets(&self.table_names(), &candidate.table_names());
        if !result.check_diff("Tables", "tables", &tables) {
            result.add_hint("Check which tables your FROM clause reads from.");
        }

        let same = self.joins.len() == candidate.joins.len();
        let same_count = result.check("Number of joins", same, || {
            format!(
                "Expected {} joins but found {}.",
                self.joins.len(),
                candidate.joins.len()
            )
        });
        if !same_count {
            result.add_hint("Check the number of JOINs in your FROM clause.");
        }

        for (index, (expected, found)) in self.joins.iter().zip(&candidate.joins).enumerate() {
            compare_join(&mut result, index + 1, expected, found);
        }

        if !self.ctes.is_empty() || !candidate.ctes.is_empty() {
            let ctes = diff_sets(&self.ctes, &candidate.ctes);
            if !result.check_diff("CTEs", "CTEs", &ctes) {
                result.add_hint("Check the common table expressions in your WITH clause.");
            }
        }

        result.finish()
    }
}

fn compare_join(result: &mut ComparisonResult, n: usize, expected: &JoinSpec, found: &JoinSpec) {
    let same = expected.join_type == found.join_type;
    let same_type = result.check(format!("Join {n} type"), same, || {
        format!(
            "Join {n}: expected {} but found {}.",
            expected.join_type, found.join_type
        )
    });
    if !same_type {
        result.add_hint(format!("Use {} for join {n}.", expected.join_type));
        return;
    }

    let same_tables = if expected.join_type.is_symmetric() {
        let mut expected_pair = [expected.left.as_str(), expected.right.as_str()];
        let mut found_pair = [found.left.as_str(), found.right.as_str()];
        expected_pair.sort_unstable();
        found_pair.sort_unstable();
        expected_pair == found_pair
    } else {
        expected.left == found.left && expected.right == found.right
    };
    result.check(format!("Join {n} tables"), same_tables, || {
        format!(
            "Join {n}: expected tables {} but found {}.",
            Fmt(&[expected.left.as_str(), expected.right.as_str()][..]),
            Fmt(&[found.left.as_str(), found.right.as_str()][..])
        )
    });

    if expected.natural || found.natural {
        result.check(format!("Join {n} NATURAL"), expected.natural == found.natural, || {
            if expected.natural {
                format!("Join {n}: missing NATURAL keyword.")
            } else {
                format!("Join {n}: unexpected NATURAL keyword.")
            }
        });
    }

    if !expected.using.is_empty() || !found.using.is_empty() {
        let using = diff_sets(&expected.using, &found.using);
        result.check_diff(&format!("Join {n} USING columns"), "USING columns", &using);
    }

    if expected.condition.is_some() || found.condition.is_some() {
        let outcome = match (&expected.condition, &found.condition) {
            (Some(reference), Some(candidate)) => {
                compare_conditions(reference, candidate).map_err(|mismatch| mismatch.to_string())
            }
            _ => Err(format!(
                "expected condition '{}' but found '{}'",
                expected.condition_text(),
                found.condition_text()
            )),
        };

        if let Err(reason) = outcome {
            result.record_mismatch(format!("Join {n} condition"), format!("Join {n}: {reason}."));
            result.add_hint(format!("Review the ON condition of join {n}."));
        } else {
            result.record_match(format!("Join {n} condition"));
        }
    }
}

fn alias_of<'a>(node: NodeRef<'a>) -> Option<&'a str> {
    node.child("alias").and_then(|alias| alias.value_of("aliasname"))
}

fn join_type(jointype: Option<&str>) -> JoinType {
    match jointype {
        Some("JOIN_INNER") | None => JoinType::Inner,
        Some("JOIN_LEFT") => JoinType::Left,
        Some("JOIN_RIGHT") => JoinType::Right,
        Some("JOIN_FULL") => JoinType::Full,
        Some(other) => JoinType::Other(other.to_string()),
    }
}
