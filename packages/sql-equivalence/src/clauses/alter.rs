use std::fmt::{self, Display};

use tracing::warn;

use super::{last_name, names, ConstraintKind, ExprContext};
use crate::comparison::ComparisonResult;
use crate::condition::ConditionNode;
use crate::log::EXTRACT;
use crate::tree::NodeRef;
use crate::Fmt;

/// The body of an `ADD CONSTRAINT`. CHECK conditions compare canonically, everything else
/// compares by its rendered text such as `PRIMARY KEY (id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintSpec {
    Check(ConditionNode),
    Key(String),
}

impl Display for ConstraintSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintSpec::Check(condition) => write!(f, "CHECK ({condition})"),
            ConstraintSpec::Key(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterOperation {
    AddColumn {
        column: String,
        type_name: String,
        not_null: bool,
    },
    DropColumn {
        column: String,
        behavior: String,
    },
    AlterColumnType {
        column: String,
        type_name: String,
    },
    SetNotNull {
        column: String,
    },
    DropNotNull {
        column: String,
    },
    RenameColumn {
        column: String,
        new_name: String,
    },
    RenameTable {
        new_name: String,
    },
    AddConstraint {
        name: Option<String>,
        constraint: ConstraintSpec,
    },
    DropConstraint {
        name: String,
    },
    SetSchema {
        target: String,
    },
    SetTablespace {
        target: String,
    },
    OwnerTo {
        target: String,
    },
}

impl AlterOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            AlterOperation::AddColumn { .. } => "ADD COLUMN",
            AlterOperation::DropColumn { .. } => "DROP COLUMN",
            AlterOperation::AlterColumnType { .. } => "ALTER COLUMN TYPE",
            AlterOperation::SetNotNull { .. } => "SET NOT NULL",
            AlterOperation::DropNotNull { .. } => "DROP NOT NULL",
            AlterOperation::RenameColumn { .. } => "RENAME COLUMN",
            AlterOperation::RenameTable { .. } => "RENAME TO",
            AlterOperation::AddConstraint { .. } => "ADD CONSTRAINT",
            AlterOperation::DropConstraint { .. } => "DROP CONSTRAINT",
            AlterOperation::SetSchema { .. } => "SET SCHEMA",
            AlterOperation::SetTablespace { .. } => "SET TABLESPACE",
            AlterOperation::OwnerTo { .. } => "OWNER TO",
        }
    }

    fn from_cmd(cmd: NodeRef<'_>) -> Option<Self> {
        let name = || cmd.value_of("name").unwrap_or_default().to_string();
        let def = cmd.child("def").and_then(|def| def.first_child());

        let operation = match cmd.value_of("subtype").unwrap_or_default() {
            "AT_AddColumn" => AlterOperation::AddColumn {
                column: def
                    .and_then(|def| def.value_of("colname"))
                    .unwrap_or_default()
                    .to_string(),
                type_name: def.map(column_type).unwrap_or_default(),
                not_null: def
                    .and_then(|def| def.child("constraints"))
                    .is_some_and(|constraints| {
                        constraints
                            .children()
                            .any(|c| ConstraintKind::of(c) == ConstraintKind::NotNull)
                    }),
            },
            "AT_DropColumn" => AlterOperation::DropColumn {
                column: name(),
                behavior: cmd.value_of("behavior").unwrap_or_default().to_string(),
            },
            "AT_AlterColumnType" => AlterOperation::AlterColumnType {
                column: name(),
                type_name: def.map(column_type).unwrap_or_default(),
            },
            "AT_SetNotNull" => AlterOperation::SetNotNull { column: name() },
            "AT_DropNotNull" => AlterOperation::DropNotNull { column: name() },
            "AT_RenameColumn" => AlterOperation::RenameColumn {
                column: name(),
                new_name: cmd.value_of("newname").unwrap_or_default().to_string(),
            },
            "AT_RenameTable" => AlterOperation::RenameTable {
                new_name: cmd.value_of("newname").unwrap_or_default().to_string(),
            },
            "AT_AddConstraint" => {
                let constraint = def?;
                AlterOperation::AddConstraint {
                    name: constraint.value_of("conname").map(str::to_string),
                    constraint: constraint_spec(constraint),
                }
            }
            "AT_DropConstraint" => AlterOperation::DropConstraint { name: name() },
            "AT_SetSchema" => AlterOperation::SetSchema {
                target: cmd.value_of("newschema").unwrap_or_default().to_string(),
            },
            "AT_SetTableSpace" => AlterOperation::SetTablespace {
                target: cmd.value_of("tablespacename").unwrap_or_default().to_string(),
            },
            "AT_OwnerTo" => AlterOperation::OwnerTo {
                target: cmd
                    .child("newowner")
                    .and_then(|owner| owner.value_of("rolename"))
                    .unwrap_or_default()
                    .to_string(),
            },
            subtype => {
                warn!(target: EXTRACT, subtype, "Skipping unsupported ALTER TABLE command");
                return None;
            }
        };

        Some(operation)
    }

    /// Explanation and hint for every parameter that differs between two operations of the
    /// same kind.
    fn differences(&self, candidate: &AlterOperation) -> Vec<(String, String)> {
        let mut diffs = Vec::new();
        let mut differ = |what: &str, expected: &str, found: &str, hint: String| {
            if expected != found {
                diffs.push((format!("expected {what} '{expected}' but found '{found}'"), hint));
            }
        };

        match (self, candidate) {
            (
                AlterOperation::AddColumn {
                    column,
                    type_name,
                    not_null,
                },
                AlterOperation::AddColumn {
                    column: found_column,
                    type_name: found_type,
                    not_null: found_not_null,
                },
            ) => {
                differ("column", column, found_column, format!("Add the column '{column}'."));
                differ(
                    "type",
                    type_name,
                    found_type,
                    format!("Use type '{type_name}' for column '{column}'."),
                );
                if not_null != found_not_null {
                    let expected = if *not_null { "NOT NULL" } else { "nullable" };
                    let found = if *found_not_null { "NOT NULL" } else { "nullable" };
                    differ(
                        "nullability",
                        expected,
                        found,
                        format!("Adjust NOT NULL for '{column}'."),
                    );
                }
            }
            (
                AlterOperation::DropColumn { column, behavior },
                AlterOperation::DropColumn {
                    column: found_column,
                    behavior: found_behavior,
                },
            ) => {
                differ("column", column, found_column, format!("Drop the column '{column}'."));
                differ(
                    "behavior",
                    behavior,
                    found_behavior,
                    format!("Use behavior '{behavior}' for DROP COLUMN."),
                );
            }
            (
                AlterOperation::AlterColumnType { column, type_name },
                AlterOperation::AlterColumnType {
                    column: found_column,
                    type_name: found_type,
                },
            ) => {
                differ("column", column, found_column, format!("Alter the column '{column}'."));
                differ("type", type_name, found_type, format!("Change type to '{type_name}'."));
            }
            (AlterOperation::SetNotNull { column }, AlterOperation::SetNotNull { column: found })
            | (
                AlterOperation::DropNotNull { column },
                AlterOperation::DropNotNull { column: found },
            ) => {
                differ(
                    "column",
                    column,
                    found,
                    format!("Use column '{column}' for the NOT NULL change."),
                );
            }
            (
                AlterOperation::RenameColumn { column, new_name },
                AlterOperation::RenameColumn {
                    column: found_column,
                    new_name: found_name,
                },
            ) => {
                differ("column", column, found_column, format!("Rename the column '{column}'."));
                differ("new name", new_name, found_name, format!("Rename to '{new_name}'."));
            }
            (
                AlterOperation::RenameTable { new_name },
                AlterOperation::RenameTable { new_name: found },
            ) => {
                differ("new name", new_name, found, format!("Use RENAME TO '{new_name}'."));
            }
            (
                AlterOperation::AddConstraint { name, constraint },
                AlterOperation::AddConstraint {
                    name: found_name,
                    constraint: found_constraint,
                },
            ) => {
                if let Some(name) = name {
                    differ(
                        "constraint name",
                        name,
                        found_name.as_deref().unwrap_or_default(),
                        format!("Name the constraint '{name}'."),
                    );
                }
                let same = match (constraint, found_constraint) {
                    (ConstraintSpec::Check(expected), ConstraintSpec::Check(found)) => {
                        expected.equivalent(found)
                    }
                    (expected, found) => expected == found,
                };
                if !same {
                    diffs.push((
                        format!("expected constraint {constraint} but found {found_constraint}"),
                        format!("Use the constraint {constraint}."),
                    ));
                }
            }
            (
                AlterOperation::DropConstraint { name },
                AlterOperation::DropConstraint { name: found },
            ) => {
                differ("constraint", name, found, format!("Drop the constraint '{name}'."));
            }
            (AlterOperation::SetSchema { target }, AlterOperation::SetSchema { target: found })
            | (
                AlterOperation::SetTablespace { target },
                AlterOperation::SetTablespace { target: found },
            )
            | (AlterOperation::OwnerTo { target }, AlterOperation::OwnerTo { target: found }) => {
                differ("target", target, found, format!("Set to '{target}'."));
            }
            (expected, found) => diffs.push((
                format!("expected {} but found {}", expected.kind(), found.kind()),
                format!("Use {}.", expected.kind()),
            )),
        }

        diffs
    }
}

/// Canonical ALTER TABLE statement, including the `RenameStmt` form of `ALTER TABLE … RENAME`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlterInfo {
    pub table: String,
    pub operations: Vec<AlterOperation>,
}

impl AlterInfo {
    pub fn extract(stmt: NodeRef<'_>) -> Self {
        let table = stmt
            .child("relation")
            .and_then(|relation| relation.value_of("relname"))
            .unwrap_or_default()
            .to_string();

        if stmt.key() == "RenameStmt" {
            return Self {
                table,
                operations: rename_operation(stmt).into_iter().collect(),
            };
        }

        let operations = stmt
            .child("cmds")
            .map(|cmds| {
                cmds.children()
                    .filter(|cmd| cmd.key() == "AlterTableCmd")
                    .filter_map(AlterOperation::from_cmd)
                    .collect()
            })
            .unwrap_or_default();

        Self { table, operations }
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.operations.iter().map(AlterOperation::kind).collect()
    }

    pub fn compare(&self, candidate: &AlterInfo) -> ComparisonResult {
        let mut result = ComparisonResult::default();

        let same_table = result.check("Table name", self.table == candidate.table, || {
            format!(
                "Table name mismatch: expected '{}', but found '{}'.",
                self.table, candidate.table
            )
        });
        if !same_table {
            result.add_hint(format!("Use ALTER TABLE {}.", self.table));
        }

        let (expected_len, found_len) = (self.operations.len(), candidate.operations.len());
        let same_count = result.check("Number of operations", expected_len == found_len, || {
            format!("Expected {expected_len} ALTER operations but found {found_len}.")
        });
        if !same_count {
            result.add_hint(format!("Ensure exactly {expected_len} ALTER operations."));
        }

        let (expected_kinds, found_kinds) = (self.kinds(), candidate.kinds());
        let same_kinds = result.check("Operation types", expected_kinds == found_kinds, || {
            format!(
                "Operation types differ: expected [{}] but found [{}].",
                Fmt(&expected_kinds),
                Fmt(&found_kinds)
            )
        });
        if !same_kinds {
            result.add_hint("Use the correct sequence of ALTER operations.");
        }

        let pairs = self.operations.iter().zip(&candidate.operations);
        for (index, (expected, found)) in pairs.enumerate() {
            let part = format!("Operation {}", index + 1);
            let differences = expected.differences(found);

            if differences.is_empty() {
                result.record_match(part);
                continue;
            }

            result.mismatched.push(part.clone());
            for (explanation, hint) in differences {
                result.add_explanation(format!("{part}: {explanation}."));
                result.add_hint(hint);
            }
        }

        result.finish()
    }
}

fn column_type(def: NodeRef<'_>) -> String {
    let type_name = if def.key() == "TypeName" {
        Some(def)
    } else {
        def.child("typeName")
    };

    type_name
        .and_then(|type_name| last_name(type_name.child("names")))
        .unwrap_or_default()
        .to_string()
}

fn constraint_spec(constraint: NodeRef<'_>) -> ConstraintSpec {
    let list = |key: &str| names(constraint.child(key)).join(", ");

    match ConstraintKind::of(constraint) {
        ConstraintKind::Check => ConstraintSpec::Check(
            constraint
                .child("raw_expr")
                .and_then(|raw| raw.first_child())
                .map(|expr| ConditionNode::from_expr(&ExprContext::default(), expr))
                .unwrap_or_else(ConditionNode::unrecognized),
        ),
        ConstraintKind::PrimaryKey => {
            ConstraintSpec::Key(format!("PRIMARY KEY ({})", list("keys")))
        }
        ConstraintKind::Unique => ConstraintSpec::Key(format!("UNIQUE ({})", list("keys"))),
        ConstraintKind::ForeignKey => {
            let table = constraint
                .child("pktable")
                .and_then(|table| table.value_of("relname"))
                .unwrap_or_default();
            ConstraintSpec::Key(format!(
                "FOREIGN KEY ({}) REFERENCES {table} ({})",
                list("fk_attrs"),
                list("pk_attrs")
            ))
        }
        kind => ConstraintSpec::Key(format!("{kind:?}")),
    }
}

fn rename_operation(stmt: NodeRef<'_>) -> Option<AlterOperation> {
    let new_name = stmt.value_of("newname").unwrap_or_default().to_string();

    match stmt.value_of("renameType") {
        Some("OBJECT_TABLE") => Some(AlterOperation::RenameTable { new_name }),
        Some("OBJECT_COLUMN") => Some(AlterOperation::RenameColumn {
            column: stmt.value_of("subname").unwrap_or_default().to_string(),
            new_name,
        }),
        other => {
            warn!(target: EXTRACT, rename_type = ?other, "Skipping unsupported RENAME");
            None
        }
    }
}
