/// Building trees from parser JSON.
pub const TREE: &str = "tree";
/// Deny-listed nodes dropped while a tree is built.
pub const PRUNE: &str = "prune";
/// Recognizing statement nodes.
pub const STATEMENT: &str = "statement";
/// Per-clause extraction and expression rendering.
pub const EXTRACT: &str = "extract";
pub const CONDITION: &str = "condition";
/// Clause comparison and statement pairing.
pub const COMPARE: &str = "compare";
pub const EDIT_DISTANCE: &str = "edit_distance";
pub const CONFIG: &str = "config";

/// Every target accepted as a key of `log.targets`.
pub const LOG_TARGETS: [&str; 8] = [
    TREE,
    PRUNE,
    STATEMENT,
    EXTRACT,
    CONDITION,
    COMPARE,
    EDIT_DISTANCE,
    CONFIG,
];
