use tracing::debug;

use super::{last_name, names, ExprContext};
use crate::comparison::{diff_sets, ComparisonResult};
use crate::condition::ConditionNode;
use crate::log::EXTRACT;
use crate::tree::NodeRef;

/// Constraint kinds as tagged by the parser's `contype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    NotNull,
    Null,
    Default,
    Identity,
    Generated,
    PrimaryKey,
    Unique,
    ForeignKey,
    Check,
    Exclusion,
    Unknown,
}

impl ConstraintKind {
    pub fn from_contype(contype: &str) -> Self {
        match contype {
            "CONSTR_NOTNULL" => ConstraintKind::NotNull,
            "CONSTR_NULL" => ConstraintKind::Null,
            "CONSTR_DEFAULT" => ConstraintKind::Default,
            "CONSTR_IDENTITY" => ConstraintKind::Identity,
            "CONSTR_GENERATED" => ConstraintKind::Generated,
            "CONSTR_PRIMARY" => ConstraintKind::PrimaryKey,
            "CONSTR_UNIQUE" => ConstraintKind::Unique,
            "CONSTR_FOREIGN" => ConstraintKind::ForeignKey,
            "CONSTR_CHECK" => ConstraintKind::Check,
            "CONSTR_EXCLUSION" => ConstraintKind::Exclusion,
            _ => ConstraintKind::Unknown,
        }
    }

    pub fn of(constraint: NodeRef<'_>) -> Self {
        Self::from_contype(constraint.value_of("contype").unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

/// Canonical CREATE TABLE statement. Column-level and table-level constraints are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateInfo {
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub unique: Vec<Vec<String>>,
    pub checks: Vec<ConditionNode>,
}

impl CreateInfo {
    pub fn extract(stmt: NodeRef<'_>) -> Self {
        let mut info = CreateInfo {
            table: stmt
                .child("relation")
                .and_then(|relation| relation.value_of("relname"))
                .unwrap_or_default()
                .to_string(),
            ..Default::default()
        };

        let Some(elements) = stmt.child("tableElts") else {
            return info;
        };

        for element in elements.children() {
            match element.key() {
                "ColumnDef" => info.column(element),
                "Constraint" => info.table_constraint(element),
                other => debug!(target: EXTRACT, key = other, "Skipping table element"),
            }
        }

        info
    }

    fn column(&mut self, def: NodeRef<'_>) {
        let name = def.value_of("colname").unwrap_or_default().to_string();
        let type_name = def
            .child("typeName")
            .and_then(|type_name| last_name(type_name.child("names")))
            .unwrap_or_default()
            .to_string();
        let mut not_null = false;

        for constraint in def.child("constraints").into_iter().flat_map(|c| c.children()) {
            match ConstraintKind::of(constraint) {
                ConstraintKind::NotNull => not_null = true,
                ConstraintKind::PrimaryKey => self.primary_key.push(name.clone()),
                ConstraintKind::Unique => self.unique.push(vec![name.clone()]),
                ConstraintKind::ForeignKey => self.foreign_keys.push(ForeignKey {
                    columns: vec![name.clone()],
                    ..foreign_key(constraint)
                }),
                ConstraintKind::Check => self.check(constraint),
                _ => {}
            }
        }

        self.columns.push(ColumnDefinition {
            name,
            type_name,
            not_null,
        });
    }

    fn table_constraint(&mut self, constraint: NodeRef<'_>) {
        match ConstraintKind::of(constraint) {
            ConstraintKind::PrimaryKey => {
                self.primary_key
                    .extend(names(constraint.child("keys")).into_iter().map(str::to_string));
            }
            ConstraintKind::Unique => {
                self.unique.push(
                    names(constraint.child("keys"))
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                );
            }
            ConstraintKind::ForeignKey => self.foreign_keys.push(foreign_key(constraint)),
            ConstraintKind::Check => self.check(constraint),
            kind => debug!(target: EXTRACT, ?kind, "Skipping table constraint"),
        }
    }

    fn check(&mut self, constraint: NodeRef<'_>) {
        if let Some(expr) = constraint.child("raw_expr").and_then(|raw| raw.first_child()) {
            self.checks
                .push(ConditionNode::from_expr(&ExprContext::default(), expr));
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    pub fn compare(&self, candidate: &CreateInfo) -> ComparisonResult {
        let mut result = ComparisonResult::default();

        let same_table = result.check("Table name", self.table == candidate.table, || {
            format!(
                "The table name should be '{}', but found '{}'.",
                self.table, candidate.table
            )
        });
        if !same_table {
            result.add_hint(format!("Change the table name to '{}'.", self.table));
        }

        self.compare_columns(&mut result, candidate);
        self.compare_primary_key(&mut result, candidate);
        self.compare_foreign_keys(&mut result, candidate);
        self.compare_unique(&mut result, candidate);
        self.compare_checks(&mut result, candidate);

        result.finish()
    }

    fn compare_columns(&self, result: &mut ComparisonResult, candidate: &CreateInfo) {
        let diff = diff_sets(&self.column_names(), &candidate.column_names());
        if diff.is_empty() {
            if !self.columns.is_empty() {
                result.record_match("Column names");
            }
        } else {
            result.check_diff("Column names", "columns", &diff);
            if !diff.missing.is_empty() {
                let missing = crate::Fmt(&diff.missing);
                result.add_hint(format!("Add the missing column(s): {missing}."));
            }
            if !diff.extra.is_empty() {
                let extra = crate::Fmt(&diff.extra);
                result.add_hint(format!("Remove the extra column(s): {extra}."));
            }
        }

        for expected in &self.columns {
            let Some(found) = candidate.columns.iter().find(|c| c.name == expected.name) else {
                continue;
            };
            let name = &expected.name;

            let same = expected.type_name == found.type_name;
            let same_type = result.check(format!("Type of '{name}'"), same, || {
                format!(
                    "The type for column '{name}' should be '{}', but found '{}'.",
                    expected.type_name, found.type_name
                )
            });
            if !same_type {
                result.add_hint(format!(
                    "Change the type of column '{name}' to '{}'.",
                    expected.type_name
                ));
            }

            let same_not_null = result.check(
                format!("NOT NULL constraint for '{name}'"),
                expected.not_null == found.not_null,
                || {
                    if expected.not_null {
                        format!("Column '{name}' should have a NOT NULL constraint.")
                    } else {
                        format!("Column '{name}' should not have a NOT NULL constraint.")
                    }
                },
            );
            if !same_not_null {
                result.add_hint(format!("Adjust the NOT NULL constraint for column '{name}'."));
            }
        }
    }

    fn compare_primary_key(&self, result: &mut ComparisonResult, candidate: &CreateInfo) {
        let diff = diff_sets(&self.primary_key, &candidate.primary_key);
        if diff.is_empty() {
            if !self.primary_key.is_empty() {
                result.record_match("Primary key");
            }
            return;
        }

        let expected = crate::Fmt(&self.primary_key);
        match candidate.primary_key.as_slice() {
            [single] if self.primary_key.len() > 1 => {
                result.record_mismatch(
                    "Primary key",
                    format!(
                        "The primary key is defined only on '{single}', but a composite primary \
                         key on ({expected}) is required."
                    ),
                );
                result.add_hint(format!("Define a composite primary key on ({expected})."));
            }
            _ => {
                result.check_diff("Primary key", "primary key columns", &diff);
                result.add_hint("Review the columns of your PRIMARY KEY.");
            }
        }
    }

    fn compare_foreign_keys(&self, result: &mut ComparisonResult, candidate: &CreateInfo) {
        let (expected, found) = (&self.foreign_keys, &candidate.foreign_keys);

        if expected.is_empty() && !found.is_empty() {
            result.record_mismatch("Foreign keys", "Unexpected FOREIGN KEY constraint(s) found.");
            result.add_hint("Remove the FOREIGN KEY constraint definitions.");
            return;
        }
        if expected.len() != found.len() {
            result.record_mismatch(
                "Foreign keys",
                format!(
                    "Expected {} foreign key constraint(s), but found {}.",
                    expected.len(),
                    found.len()
                ),
            );
            result.add_hint("Review your FOREIGN KEY definitions.");
            return;
        }

        let mut all_match = true;
        for (index, (expected, found)) in expected.iter().zip(found).enumerate() {
            let n = index + 1;
            if expected.columns != found.columns {
                all_match = false;
                result.add_explanation(format!(
                    "For FOREIGN KEY constraint {n}, expected local column(s) ({}) but found ({}).",
                    crate::Fmt(&expected.columns),
                    crate::Fmt(&found.columns)
                ));
            }
            if expected.referenced_table != found.referenced_table {
                all_match = false;
                result.add_explanation(format!(
                    "For FOREIGN KEY constraint {n}, expected referenced table '{}' but found \
                     '{}'.",
                    expected.referenced_table, found.referenced_table
                ));
            }
            if expected.referenced_columns != found.referenced_columns {
                all_match = false;
                result.add_explanation(format!(
                    "For FOREIGN KEY constraint {n}, expected referenced column(s) ({}) but \
                     found ({}).",
                    crate::Fmt(&expected.referenced_columns),
                    crate::Fmt(&found.referenced_columns)
                ));
            }
            if expected != found {
                result.add_hint(format!("Adjust your FOREIGN KEY definition {n}."));
            }
        }

        if !all_match {
            result.mismatched.push("Foreign keys".to_string());
        } else if !self.foreign_keys.is_empty() {
            result.record_match("Foreign keys");
        }
    }

    fn compare_unique(&self, result: &mut ComparisonResult, candidate: &CreateInfo) {
        let (expected, found) = (&self.unique, &candidate.unique);

        if expected.is_empty() && !found.is_empty() {
            result.record_mismatch("Unique constraints", "Unexpected UNIQUE constraint(s) found.");
            result.add_hint("Remove the UNIQUE constraint definitions.");
            return;
        }
        if expected.len() != found.len() {
            result.record_mismatch(
                "Unique constraints",
                format!(
                    "Expected {} UNIQUE constraint(s), but found {}.",
                    expected.len(),
                    found.len()
                ),
            );
            result.add_hint("Review your UNIQUE constraint definitions.");
            return;
        }

        let mut all_match = true;
        for (index, (expected, found)) in expected.iter().zip(found).enumerate() {
            if expected != found {
                let n = index + 1;
                all_match = false;
                result.add_explanation(format!(
                    "For UNIQUE constraint {n}, expected column(s) ({}) but found ({}).",
                    crate::Fmt(expected),
                    crate::Fmt(found)
                ));
                result.add_hint(format!("Adjust the UNIQUE constraint definition {n}."));
            }
        }

        if !all_match {
            result.mismatched.push("Unique constraints".to_string());
        } else if !self.unique.is_empty() {
            result.record_match("Unique constraints");
        }
    }

    fn compare_checks(&self, result: &mut ComparisonResult, candidate: &CreateInfo) {
        let (expected, found) = (&self.checks, &candidate.checks);

        if expected.is_empty() {
            if !found.is_empty() {
                result.record_mismatch(
                    "Check constraints",
                    "Unexpected CHECK constraint(s) found.",
                );
                result.add_hint("Remove the CHECK constraint definitions.");
            }
            return;
        }
        if expected.len() != found.len() {
            result.record_mismatch(
                "Check constraints",
                format!(
                    "Expected {} CHECK constraint(s), but found {}.",
                    expected.len(),
                    found.len()
                ),
            );
            result.add_hint("Review your CHECK constraint definitions.");
            return;
        }

        let mut all_match = true;
        for (index, (expected, found)) in expected.iter().zip(found).enumerate() {
            if !expected.equivalent(found) {
                let n = index + 1;
                all_match = false;
                result.add_explanation(format!(
                    "For CHECK constraint {n}, expected: {expected} but found: {found}."
                ));
                result.add_hint(format!("Adjust the CHECK constraint definition {n}."));
            }
        }

        if all_match {
            result.record_match("Check constraints");
        } else {
            result.mismatched.push("Check constraints".to_string());
        }
    }
}

fn foreign_key(constraint: NodeRef<'_>) -> ForeignKey {
    let list = |primary: &str, fallback: &str| {
        names(constraint.child(primary).or_else(|| constraint.child(fallback)))
            .into_iter()
            .map(str::to_string)
            .collect()
    };

    ForeignKey {
        columns: list("fk_attrs", "fk_cols"),
        referenced_table: constraint
            .child("pktable")
            .and_then(|table| table.value_of("relname"))
            .unwrap_or_default()
            .to_string(),
        referenced_columns: list("pk_attrs", "pk_cols"),
    }
}
