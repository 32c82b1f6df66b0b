#![allow(dead_code)]

use serde_json::{json, Value};
use sql_equivalence::{statement_node, NodeRef, Tree};
use std::sync::Once;
use tracing_subscriber::{filter::Directive, EnvFilter, FmtSubscriber};

static INIT: Once = Once::new();

pub fn trace() {
    INIT.call_once(|| {
        let log_level: Directive = tracing::Level::DEBUG.into();

        let filter = EnvFilter::from_default_env().add_directive(log_level.to_owned());

        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_test_writer()
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");
    });
}

/// Wraps statements the way the parser does: `{"version", "stmts": [{"stmt", "stmt_len"}]}`.
pub fn document(statements: Vec<Value>) -> Tree {
    let stmts: Vec<Value> = statements
        .into_iter()
        .map(|stmt| json!({ "stmt": stmt, "stmt_len": 0 }))
        .collect();

    Tree::from_json(&json!({ "version": 170004, "stmts": stmts }))
}

pub fn statement(tree: &Tree) -> NodeRef<'_> {
    statement_node(tree.root()).expect("document holds a statement")
}

fn strings(parts: &[&str]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| json!({ "String": { "sval": part } }))
        .collect()
}

pub fn col(parts: &[&str]) -> Value {
    json!({ "ColumnRef": { "fields": strings(parts), "location": 7 } })
}

pub fn star() -> Value {
    json!({ "ColumnRef": { "fields": [{ "A_Star": {} }], "location": 7 } })
}

/// The parser omits zero-valued fields, so `0` arrives as an empty `ival`.
pub fn int(value: i64) -> Value {
    if value == 0 {
        json!({ "A_Const": { "ival": {}, "location": 3 } })
    } else {
        json!({ "A_Const": { "ival": { "ival": value }, "location": 3 } })
    }
}

pub fn string(value: &str) -> Value {
    json!({ "A_Const": { "sval": { "sval": value }, "location": 3 } })
}

pub fn count_star() -> Value {
    json!({ "FuncCall": {
        "funcname": strings(&["count"]),
        "agg_star": true,
        "funcformat": "COERCE_EXPLICIT_CALL",
        "location": 7
    } })
}

pub fn op(left: Value, name: &str, right: Value) -> Value {
    json!({ "A_Expr": {
        "kind": "AEXPR_OP",
        "name": strings(&[name]),
        "lexpr": left,
        "rexpr": right,
        "location": 12
    } })
}

pub fn and(args: Vec<Value>) -> Value {
    json!({ "BoolExpr": { "boolop": "AND_EXPR", "args": args, "location": 20 } })
}

pub fn or(args: Vec<Value>) -> Value {
    json!({ "BoolExpr": { "boolop": "OR_EXPR", "args": args, "location": 20 } })
}

pub fn target(val: Value) -> Value {
    json!({ "ResTarget": { "val": val, "location": 7 } })
}

pub fn named_target(name: &str, val: Value) -> Value {
    json!({ "ResTarget": { "name": name, "val": val, "location": 7 } })
}

pub fn relation(name: &str) -> Value {
    json!({ "relname": name, "inh": true, "relpersistence": "p", "location": 14 })
}

pub fn range_var(name: &str, alias: Option<&str>) -> Value {
    let mut range_var = relation(name);
    if let Some(alias) = alias {
        range_var["alias"] = json!({ "aliasname": alias });
    }
    json!({ "RangeVar": range_var })
}

pub fn inner_join(left: Value, right: Value, quals: Value) -> Value {
    json!({ "JoinExpr": {
        "jointype": "JOIN_INNER",
        "larg": left,
        "rarg": right,
        "quals": quals
    } })
}

pub fn select(targets: Vec<Value>, from: Vec<Value>) -> Value {
    let mut body = json!({
        "targetList": targets,
        "limitOption": "LIMIT_OPTION_DEFAULT",
        "op": "SETOP_NONE"
    });
    if !from.is_empty() {
        body["fromClause"] = json!(from);
    }
    json!({ "SelectStmt": body })
}

/// Sets `clause` on the body of a wrapped statement such as `{"SelectStmt": {..}}`.
pub fn with(mut statement: Value, clause: &str, value: Value) -> Value {
    if let Some(body) = statement
        .as_object_mut()
        .and_then(|wrapper| wrapper.values_mut().next())
    {
        body[clause] = value;
    }
    statement
}

pub fn sort_by(node: Value, dir: &str) -> Value {
    json!({ "SortBy": {
        "node": node,
        "sortby_dir": dir,
        "sortby_nulls": "SORTBY_NULLS_DEFAULT",
        "location": -1
    } })
}

pub fn insert(table: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Value {
    let cols: Vec<Value> = columns
        .iter()
        .map(|name| json!({ "ResTarget": { "name": name, "location": 20 } }))
        .collect();
    let values: Vec<Value> = rows
        .into_iter()
        .map(|items| json!({ "List": { "items": items } }))
        .collect();

    json!({ "InsertStmt": {
        "relation": relation(table),
        "cols": cols,
        "selectStmt": { "SelectStmt": {
            "valuesLists": values,
            "limitOption": "LIMIT_OPTION_DEFAULT",
            "op": "SETOP_NONE"
        } },
        "override": "OVERRIDING_NOT_SET"
    } })
}

pub fn update(table: &str, assignments: Vec<(&str, Value)>, condition: Option<Value>) -> Value {
    let targets: Vec<Value> = assignments
        .into_iter()
        .map(|(name, val)| named_target(name, val))
        .collect();
    let mut body = json!({ "relation": relation(table), "targetList": targets });
    if let Some(condition) = condition {
        body["whereClause"] = condition;
    }
    json!({ "UpdateStmt": body })
}

pub fn delete(table: &str, using: Vec<Value>, condition: Option<Value>) -> Value {
    let mut body = json!({ "relation": relation(table) });
    if !using.is_empty() {
        body["usingClause"] = json!(using);
    }
    if let Some(condition) = condition {
        body["whereClause"] = condition;
    }
    json!({ "DeleteStmt": body })
}

pub fn column_def(name: &str, type_name: &str, not_null: bool) -> Value {
    let constraints = if not_null {
        json!([{ "Constraint": { "contype": "CONSTR_NOTNULL", "location": 40 } }])
    } else {
        json!([])
    };
    json!({ "ColumnDef": {
        "colname": name,
        "typeName": {
            "names": strings(&["pg_catalog", type_name]),
            "typemod": -1,
            "location": 20
        },
        "is_local": true,
        "constraints": constraints,
        "location": 15
    } })
}

pub fn primary_key(columns: &[&str]) -> Value {
    json!({ "Constraint": {
        "contype": "CONSTR_PRIMARY",
        "keys": strings(columns),
        "location": 60
    } })
}

pub fn create_table(table: &str, elements: Vec<Value>) -> Value {
    json!({ "CreateStmt": {
        "relation": relation(table),
        "tableElts": elements,
        "oncommit": "ONCOMMIT_NOOP"
    } })
}

pub fn alter_table(table: &str, cmds: Vec<Value>) -> Value {
    let cmds: Vec<Value> = cmds
        .into_iter()
        .map(|cmd| json!({ "AlterTableCmd": cmd }))
        .collect();
    json!({ "AlterTableStmt": {
        "relation": relation(table),
        "cmds": cmds,
        "objtype": "OBJECT_TABLE"
    } })
}

pub fn add_column(name: &str, type_name: &str) -> Value {
    json!({
        "subtype": "AT_AddColumn",
        "def": column_def(name, type_name, false),
        "behavior": "DROP_RESTRICT"
    })
}

pub fn rename_table(new_name: &str) -> Value {
    json!({ "subtype": "AT_RenameTable", "newname": new_name, "behavior": "DROP_RESTRICT" })
}

pub fn view(name: &str, query: Value) -> Value {
    json!({ "ViewStmt": {
        "view": relation(name),
        "query": query,
        "withCheckOption": "NO_CHECK_OPTION"
    } })
}

pub fn assertion(name: &str, condition: Value) -> Value {
    json!({ "CreateAssertionStmt": { "assertion_name": name, "check_expr": condition } })
}
