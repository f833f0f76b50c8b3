//! Arena syntax tree for JavaScript units.
//!
//! The tree is a flat arena of [`Node`]s addressed by [`NodeIndex`]. Every
//! node records its parent so resolvers can walk upwards (a variable fragment
//! finds its declared type through its parent statement). The tree carries no
//! resolution logic; semantic questions go through the binding resolver
//! attached to a resolved tree.

pub mod node;
pub use node::{
    AssignmentOperator, InfixOperator, Node, NodeIndex, NodeKind, PostfixOperator,
    PrefixOperator, PrimitiveCode,
};

pub mod arena;
pub use arena::NodeArena;

pub mod tree;
pub use tree::{SyntaxFlags, SyntaxTree};

pub mod builder;
pub use builder::TreeBuilder;

pub mod printer;
pub use printer::{name_text, type_text};
