//! Test helpers: environment isolation, a capturing log writer and builders for the
//! parser's JSON shapes.

use serde_json::{json, Value};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use tracing_subscriber::fmt::MakeWriter;

use crate::config::{LogConfig, LogLevel};
use crate::tree::Tree;

/// Runs a function with all SQLEQ_ environment variables unset
pub(crate) fn with_no_sqleq_vars<F: FnOnce() -> R, R>(f: F) -> R {
    let vars = std::env::vars()
        .map(|(k, _v)| k)
        .filter(|k| k.starts_with("SQLEQ_"))
        .collect::<Vec<_>>();

    temp_env::with_vars_unset(&vars, f)
}

// Mock Writer for testing the logging behaviour, adapted from tracing_subscriber's internal
// test code.
pub(crate) struct MockWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MockWriter {
    pub(crate) fn new(buf: Arc<Mutex<Vec<u8>>>) -> Self {
        Self { buf }
    }

    pub(crate) fn map_error<Guard>(err: TryLockError<Guard>) -> io::Error {
        match err {
            TryLockError::WouldBlock => io::Error::from(io::ErrorKind::WouldBlock),
            TryLockError::Poisoned(_) => io::Error::from(io::ErrorKind::Other),
        }
    }

    pub(crate) fn buf(&self) -> io::Result<MutexGuard<'_, Vec<u8>>> {
        self.buf.try_lock().map_err(Self::map_error)
    }
}

impl io::Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.buf()?.flush()
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockMakeWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MockMakeWriter {
    pub(crate) fn get_string(&self) -> String {
        let mut buf = self.buf.lock().expect("lock shouldn't be poisoned");
        let string = std::str::from_utf8(&buf[..])
            .expect("formatter should not have produced invalid utf-8")
            .to_owned();
        buf.clear();
        string
    }
}

impl<'a> MakeWriter<'a> for MockMakeWriter {
    type Writer = MockWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MockWriter::new(self.buf.clone())
    }
}

/// Captures every event logged on this thread, at trace level, until the guard drops.
pub(crate) fn trace() -> (MockMakeWriter, tracing::subscriber::DefaultGuard) {
    let writer = MockMakeWriter::default();
    let config = LogConfig::with_level(LogLevel::Trace);
    let guard = tracing::subscriber::set_default(crate::log::subscriber(&config, writer.clone()));
    (writer, guard)
}

/// Every ordering of `items`, built by repeated insertion. Duplicates give repeated orderings.
pub(crate) fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    let mut all: Vec<Vec<T>> = vec![vec![]];
    for item in items {
        all = all
            .into_iter()
            .flat_map(|partial| {
                (0..=partial.len()).map(move |at| {
                    let mut next = partial.clone();
                    next.insert(at, item.clone());
                    next
                })
            })
            .collect();
    }
    all
}

/// Wraps statements the way the parser does: `{"version", "stmts": [{"stmt", "stmt_len"}]}`.
pub(crate) fn document(statements: Vec<Value>) -> Value {
    let stmts: Vec<Value> = statements
        .into_iter()
        .map(|stmt| json!({ "stmt": stmt, "stmt_len": 0 }))
        .collect();

    json!({ "version": 170004, "stmts": stmts })
}

/// Builds a pruned tree holding a single statement.
pub(crate) fn statement_tree(statement: Value) -> Tree {
    Tree::from_json(&document(vec![statement]))
}

fn strings(parts: &[&str]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| json!({ "String": { "sval": part } }))
        .collect()
}

pub(crate) fn col(parts: &[&str]) -> Value {
    json!({ "ColumnRef": { "fields": strings(parts), "location": 7 } })
}

pub(crate) fn star(qualifier: Option<&str>) -> Value {
    let mut fields = qualifier.map(|q| strings(&[q])).unwrap_or_default();
    fields.push(json!({ "A_Star": {} }));
    json!({ "ColumnRef": { "fields": fields, "location": 7 } })
}

pub(crate) fn int(value: i64) -> Value {
    if value == 0 {
        json!({ "A_Const": { "ival": {}, "location": 3 } })
    } else {
        json!({ "A_Const": { "ival": { "ival": value }, "location": 3 } })
    }
}

pub(crate) fn string(value: &str) -> Value {
    json!({ "A_Const": { "sval": { "sval": value }, "location": 3 } })
}

pub(crate) fn func(name: &str, args: Vec<Value>, agg_star: bool) -> Value {
    let mut call = json!({
        "funcname": strings(&[name]),
        "funcformat": "COERCE_EXPLICIT_CALL",
        "location": 7
    });
    if agg_star {
        call["agg_star"] = json!(true);
    } else {
        call["args"] = json!(args);
    }
    json!({ "FuncCall": call })
}

pub(crate) fn op_expr(left: Value, op: &str, right: Value) -> Value {
    json!({ "A_Expr": {
        "kind": "AEXPR_OP",
        "name": strings(&[op]),
        "lexpr": left,
        "rexpr": right,
        "location": 12
    } })
}

pub(crate) fn in_list(left: Value, items: Vec<Value>, negated: bool) -> Value {
    json!({ "A_Expr": {
        "kind": "AEXPR_IN",
        "name": strings(&[if negated { "<>" } else { "=" }]),
        "lexpr": left,
        "rexpr": { "List": { "items": items } },
        "location": 12
    } })
}

fn bool_expr(boolop: &str, args: Vec<Value>) -> Value {
    json!({ "BoolExpr": { "boolop": boolop, "args": args, "location": 20 } })
}

pub(crate) fn and(args: Vec<Value>) -> Value {
    bool_expr("AND_EXPR", args)
}

pub(crate) fn or(args: Vec<Value>) -> Value {
    bool_expr("OR_EXPR", args)
}

pub(crate) fn not(arg: Value) -> Value {
    bool_expr("NOT_EXPR", vec![arg])
}

pub(crate) fn null_test_expr(arg: Value, negated: bool) -> Value {
    let kind = if negated { "IS_NOT_NULL" } else { "IS_NULL" };
    json!({ "NullTest": { "arg": arg, "nulltesttype": kind, "location": 30 } })
}

pub(crate) fn res_target(val: Value, alias: Option<&str>) -> Value {
    match alias {
        Some(alias) => json!({ "ResTarget": { "name": alias, "val": val, "location": 7 } }),
        None => json!({ "ResTarget": { "val": val, "location": 7 } }),
    }
}

/// A `RangeVar` body, for typed fields such as `relation` that the parser emits unwrapped.
pub(crate) fn relation(name: &str) -> Value {
    json!({ "relname": name, "inh": true, "relpersistence": "p", "location": 14 })
}

pub(crate) fn range_var(name: &str, alias: Option<&str>) -> Value {
    let mut range_var = relation(name);
    if let Some(alias) = alias {
        range_var["alias"] = json!({ "aliasname": alias });
    }
    json!({ "RangeVar": range_var })
}

pub(crate) fn join(join_type: &str, left: Value, right: Value, quals: Option<Value>) -> Value {
    let mut join = json!({ "jointype": join_type, "larg": left, "rarg": right });
    if let Some(quals) = quals {
        join["quals"] = quals;
    }
    json!({ "JoinExpr": join })
}

/// A `SelectStmt` with a target list and from clause, ready for further clauses.
pub(crate) fn select(targets: Vec<Value>, from: Vec<Value>) -> Value {
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
pub(crate) fn with(mut statement: Value, clause: &str, value: Value) -> Value {
    if let Some(body) = statement
        .as_object_mut()
        .and_then(|wrapper| wrapper.values_mut().next())
    {
        body[clause] = value;
    }
    statement
}

pub(crate) fn sort_by(node: Value, dir: &str, nulls: &str) -> Value {
    json!({ "SortBy": {
        "node": node,
        "sortby_dir": dir,
        "sortby_nulls": nulls,
        "location": -1
    } })
}
