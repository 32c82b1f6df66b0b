//! Locating statements inside a parsed document.
//!
//! The parser wraps every statement as `stmts -> stmt -> <Kind>Stmt`. A `stmt` node with at
//! least one child is a single statement. A `stmts` node is a statement collection.

use derive_more::Display;
use tracing::debug;

use crate::log::STATEMENT;
use crate::tree::NodeRef;

const STMT_KEY: &str = "stmt";
const STMTS_KEY: &str = "stmts";

/// Node names the parser uses for statements, in the order of its node catalogue.
pub const STATEMENT_TYPES: &[&str] = &[
    "AlterEventTrigStmt", "AlterCollationStmt", "AlterDatabaseStmt", "AlterDatabaseSetStmt",
    "AlterDefaultPrivilegesStmt", "AlterDomainStmt", "AlterEnumStmt", "AlterExtensionStmt",
    "AlterExtensionContentsStmt", "AlterFdwStmt", "AlterForeignServerStmt", "AlterFunctionStmt",
    "AlterGroupStmt", "AlterObjectDependsStmt", "AlterObjectSchemaStmt", "AlterOwnerStmt",
    "AlterOperatorStmt", "AlterTypeStmt", "AlterPolicyStmt", "AlterSeqStmt", "AlterSystemStmt",
    "AlterTableStmt", "AlterTblSpcStmt", "AlterCompositeTypeStmt", "AlterPublicationStmt",
    "AlterRoleSetStmt", "AlterRoleStmt", "AlterSubscriptionStmt", "AlterStatsStmt",
    "AlterTSConfigurationStmt", "AlterTSDictionaryStmt", "AlterUserMappingStmt", "AnalyzeStmt",
    "CallStmt", "CheckPointStmt", "ClosePortalStmt", "ClusterStmt", "CommentStmt",
    "ConstraintsSetStmt", "CopyStmt", "CreateAmStmt", "CreateAsStmt", "CreateAssertionStmt",
    "CreateCastStmt", "CreateConversionStmt", "CreateDomainStmt", "CreateExtensionStmt",
    "CreateFdwStmt", "CreateForeignServerStmt", "CreateForeignTableStmt", "CreateFunctionStmt",
    "CreateGroupStmt", "CreateMatViewStmt", "CreateOpClassStmt", "CreateOpFamilyStmt",
    "CreatePublicationStmt", "AlterOpFamilyStmt", "CreatePolicyStmt", "CreatePLangStmt",
    "CreateSchemaStmt", "CreateSeqStmt", "CreateStmt", "CreateSubscriptionStmt",
    "CreateStatsStmt", "CreateTableSpaceStmt", "CreateTransformStmt", "CreateTrigStmt",
    "CreateEventTrigStmt", "CreateRoleStmt", "CreateUserStmt", "CreateUserMappingStmt",
    "CreatedbStmt", "DeallocateStmt", "DeclareCursorStmt", "DefineStmt", "DeleteStmt",
    "DiscardStmt", "DoStmt", "DropCastStmt", "DropOpClassStmt", "DropOpFamilyStmt",
    "DropOwnedStmt", "DropStmt", "DropSubscriptionStmt", "DropTableSpaceStmt",
    "DropTransformStmt", "DropRoleStmt", "DropUserMappingStmt", "DropdbStmt", "ExecuteStmt",
    "ExplainStmt", "FetchStmt", "GrantStmt", "GrantRoleStmt", "ImportForeignSchemaStmt",
    "IndexStmt", "InsertStmt", "ListenStmt", "RefreshMatViewStmt", "LoadStmt", "LockStmt",
    "MergeStmt", "NotifyStmt", "PrepareStmt", "ReassignOwnedStmt", "ReindexStmt",
    "RemoveAggrStmt", "RemoveFuncStmt", "RemoveOperStmt", "RenameStmt", "RevokeStmt",
    "RevokeRoleStmt", "RuleStmt", "SecLabelStmt", "SelectStmt", "TransactionStmt",
    "TruncateStmt", "UnlistenStmt", "UpdateStmt", "VacuumStmt", "VariableResetStmt",
    "VariableSetStmt", "VariableShowStmt", "ViewStmt",
];

/// Statement kinds with a dedicated comparator. Everything else is `Other`, carrying the
/// parser's node name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum StatementKind {
    #[display("SELECT")]
    Select,
    #[display("INSERT")]
    Insert,
    #[display("UPDATE")]
    Update,
    #[display("DELETE")]
    Delete,
    #[display("CREATE TABLE")]
    CreateTable,
    #[display("ALTER TABLE")]
    AlterTable,
    #[display("RENAME")]
    Rename,
    #[display("CREATE VIEW")]
    CreateView,
    #[display("CREATE ASSERTION")]
    CreateAssertion,
    #[display("{_0}")]
    Other(String),
}

impl StatementKind {
    pub fn from_key(key: &str) -> Self {
        match key {
            "SelectStmt" => StatementKind::Select,
            "InsertStmt" => StatementKind::Insert,
            "UpdateStmt" => StatementKind::Update,
            "DeleteStmt" => StatementKind::Delete,
            "CreateStmt" => StatementKind::CreateTable,
            "AlterTableStmt" => StatementKind::AlterTable,
            "RenameStmt" => StatementKind::Rename,
            "ViewStmt" => StatementKind::CreateView,
            "CreateAssertionStmt" => StatementKind::CreateAssertion,
            other => {
                if !is_statement_type(other) {
                    debug!(target: STATEMENT, key = other, "Not a known statement node");
                }
                StatementKind::Other(other.to_string())
            }
        }
    }

    /// Kind of the statement below `node`, which may be a document root, a `stmt` wrapper
    /// or the statement node itself.
    pub fn of(node: NodeRef<'_>) -> Option<Self> {
        if is_statement_type(node.key()) {
            return Some(Self::from_key(node.key()));
        }
        statement_node(node).map(|stmt| Self::from_key(stmt.key()))
    }
}

pub fn is_statement_type(key: &str) -> bool {
    STATEMENT_TYPES.contains(&key)
}

fn is_statement(node: &NodeRef<'_>) -> bool {
    node.key() == STMT_KEY && node.has_children()
}

/// Key of the first statement found depth-first below `root`, or `""` when there is none.
pub fn statement_type<'a>(root: NodeRef<'a>) -> &'a str {
    statement_node(root).map(|stmt| stmt.key()).unwrap_or_default()
}

/// The node wrapped by the first statement found depth-first below `root`.
pub fn statement_node(root: NodeRef<'_>) -> Option<NodeRef<'_>> {
    root.find(is_statement).and_then(|stmt| stmt.first_child())
}

/// Every top-level statement wrapper below `root`, in source order.
pub fn all_statements(root: NodeRef<'_>) -> Vec<NodeRef<'_>> {
    if is_statement(&root) {
        return vec![root];
    }

    if root.key() == STMTS_KEY {
        return root.children().filter(is_statement).collect();
    }

    root.children().flat_map(all_statements).collect()
}
