use crate::piece_tree::lines::into_string;
use crate::piece_tree::tree::piece::Piece;
use crate::piece_tree::tree::pieces::PieceIter;
use crate::piece_tree::PieceTree;

/// A pull-based stream over the document content as it was when the
/// snapshot was taken.
///
/// The snapshot captures the ordered piece values, not the tree. Pieces
/// are never mutated in place by edits (they are replaced) and buffers are
/// only appended to, so the captured pieces keep describing the original
/// content.
#[derive(Debug)]
pub struct Snapshot<'a> {
    pt: &'a PieceTree,
    pieces: Vec<Piece>,
    bom: String,
    index: usize,
}

impl<'a> Snapshot<'a> {
    pub(crate) fn new(pt: &'a PieceTree, bom: &str) -> Snapshot<'a> {
        let mut pieces = Vec::with_capacity(pt.piece_count());
        let mut iter = PieceIter::new(&pt.tree, pt.len, 0);
        let mut cur = iter.get();

        while let Some((_, piece)) = cur {
            pieces.push(piece);
            cur = iter.next();
        }

        Snapshot {
            pt,
            pieces,
            bom: bom.to_string(),
            index: 0,
        }
    }

    /// One piece worth of content per call, the BOM prefixed to the first
    /// chunk, `None` at end of stream.
    pub fn read(&mut self) -> Option<String> {
        if self.index >= self.pieces.len() {
            if self.index == 0 {
                // Empty document, still hand out the BOM once.
                self.index += 1;
                return Some(self.bom.clone());
            }
            return None;
        }

        let bytes = self.pt.buffers.piece_bytes(&self.pieces[self.index]);
        let chunk = into_string(bytes.to_vec());
        self.index += 1;

        if self.index == 1 && !self.bom.is_empty() {
            return Some(format!("{}{}", self.bom, chunk));
        }

        Some(chunk)
    }
}
