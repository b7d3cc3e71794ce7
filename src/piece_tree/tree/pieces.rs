use super::node::{InternalNode, Node};
use super::piece::Piece;
use super::Tree;

/// Traverse pieces of the tree in order, starting from the piece that
/// contains a document position. Yields `(piece_start_offset, piece)`.
/// Forward-only: readers always walk from a located start towards the
/// document end.
#[derive(Debug, Clone)]
pub(crate) struct PieceIter<'a> {
    stack: Vec<&'a InternalNode>,
    pos: usize, // Document offset of the current piece
}

impl<'a> PieceIter<'a> {
    #[inline]
    pub(crate) fn new(tree: &'a Tree, len: usize, at: usize) -> Self {
        // Be empty at the document end
        let (stack, pos) = if at == len {
            (Vec::new(), at)
        } else {
            tree.find_node(at)
        };
        PieceIter { stack, pos }
    }

    fn tree_next(&mut self) -> Option<&Piece> {
        let mut node = *self.stack.last()?;

        // Try to go right
        if let Node::Internal(right) = node.right.as_ref() {
            self.stack.push(right);

            node = right;

            while let Node::Internal(left) = node.left.as_ref() {
                self.stack.push(left);
                node = left;
            }

            Some(&node.piece)
        } else {
            self.stack.pop()?;

            while !self.stack.is_empty() {
                let left = self.stack.last()?.left.as_ref();

                // If we came from left
                if left
                    .internal_ref()
                    .map_or(false, |left| std::ptr::eq(left, node))
                {
                    return Some(&self.stack.last()?.piece);
                }

                node = self.stack.pop()?;
            }

            None
        }
    }

    #[inline]
    pub fn get(&self) -> Option<(usize, Piece)> {
        let piece = self.stack.last().map(|&node| node.piece.clone())?;
        Some((self.pos, piece))
    }

    #[inline]
    pub fn next(&mut self) -> Option<(usize, Piece)> {
        let prev_len = self.get()?.1.len;

        let p = self.tree_next().cloned()?;
        self.pos += prev_len;
        Some((self.pos, p))
    }
}
