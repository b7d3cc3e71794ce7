//! In-memory text buffer built on a piece tree.
//!
//! The document is stored as pieces referencing immutable original buffers
//! and one append-only change buffer, indexed by a red-black tree that
//! tracks byte and line feed totals per subtree. Random-offset inserts and
//! deletes, offset to (line, column) mapping in both directions, and line
//! content extraction all run in O(log n) plus output size.

mod piece_tree;

pub use piece_tree::{
    builder::PieceTreeBuilder, eol::EndOfLine, snapshot::Snapshot, PieceTree,
};
