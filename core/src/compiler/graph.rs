//! Block graph query contract
//!
//! The compiler only ever reads the editor's block graph through this trait,
//! so any editor model (or a test fixture) can be compiled.

/// Read-only view of a block graph
pub trait BlockGraph {
    /// Cheap handle to one node in the graph
    type Node: Copy;

    /// Top-level nodes in deterministic order
    fn top_level(&self) -> Vec<Self::Node>;

    /// Block type tag, e.g. `bp_move`
    fn node_type(&self, node: Self::Node) -> &str;

    /// Stable block id, carried into compiled commands for highlighting
    fn node_id(&self, node: Self::Node) -> &str;

    /// Field value by name
    fn field(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// Node plugged into the named value or statement input
    fn input_target(&self, node: Self::Node, input: &str) -> Option<Self::Node>;

    /// Next node in a statement chain
    fn next(&self, node: Self::Node) -> Option<Self::Node>;
}
