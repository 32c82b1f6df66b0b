//! Per-clause extraction and comparison.
//!
//! Each `*Info` type is built from one statement node and compared against another value of
//! the same type, producing a [`ComparisonResult`](crate::ComparisonResult).

mod alter;
mod assertion;
mod create;
mod delete;
mod expr;
mod filter;
mod from;
mod group_by;
mod insert;
mod order_by;
mod select;
mod update;
mod view;

pub use alter::{AlterInfo, AlterOperation, ConstraintSpec};
pub use assertion::AssertionInfo;
pub use create::{ColumnDefinition, ConstraintKind, CreateInfo, ForeignKey};
pub use delete::DeleteInfo;
pub use expr::{
    constant, last_name, names, ExprContext, ExprKind, OperatorExpr, SUBQUERY,
    UNKNOWN_EXPRESSION,
};
pub use filter::{FilterClause, FilterInfo};
pub use from::{FromInfo, JoinSpec, JoinType, TableRef, FUNCTION_SOURCE, NESTED_JOIN};
pub use group_by::GroupByInfo;
pub use insert::{InsertInfo, ANY_VALUE};
pub use order_by::{NullsOrder, OrderByInfo, OrderItem, SortDirection, INVALID_POSITION};
pub use select::{ItemKind, SelectInfo, SelectItem};
pub use update::UpdateInfo;
pub use view::ViewInfo;

pub(crate) use expr::null_test;
