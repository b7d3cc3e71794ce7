pub(crate) mod buffers;
pub(crate) mod builder;
pub(crate) mod cache;
pub(crate) mod eol;
pub(crate) mod lines;
pub(crate) mod snapshot;
pub(crate) mod tree;

use std::cell::RefCell;
use std::io::{self, Read};
use std::mem;

use self::buffers::{Buffers, CHANGE_BUFFER};
use self::cache::{CacheEntry, SearchCache};
use self::eol::EndOfLine;
use self::snapshot::Snapshot;
use self::tree::node::Node;
use self::tree::piece::Piece;
use self::tree::pieces::PieceIter;
use self::builder::PieceTreeBuilder;
use self::tree::Tree;

/// Inserts larger than this go into their own read-only buffers instead of
/// the change buffer, and the append fast path only extends a piece by
/// less than this.
pub(crate) const AVERAGE_BUFFER_SIZE: usize = 65535;

const SEARCH_CACHE_LIMIT: usize = 4;

/// Resolved document position: the piece covering it, the byte offset into
/// the piece and the document offset at which the piece starts.
#[derive(Debug, Clone)]
pub(crate) struct NodePosition {
    pub(crate) piece: Piece,
    pub(crate) remainder: usize,
    pub(crate) start_offset: usize,
}

/// In-memory text buffer over a piece tree.
///
/// The document is a sequence of pieces referencing immutable original
/// buffers and one append-only change buffer. The pieces live in a
/// red-black tree ordered by document position, with per-node byte and
/// line feed totals so offsets and (line, column) coordinates resolve in
/// O(log n) either way.
///
/// Coordinates on the public surface are 1-based lines and columns and
/// 0-based byte offsets. Out of range coordinates clamp instead of
/// failing.
#[derive(Debug)]
pub struct PieceTree {
    pub(crate) buffers: Buffers,
    pub(crate) tree: Tree,
    pub(crate) len: usize,
    pub(crate) line_count: usize,
    eol: EndOfLine,
    eol_normalized: bool,
    search_cache: RefCell<SearchCache>,
    visited_line: RefCell<Option<(usize, String)>>,
}

impl PieceTree {
    /// Create a new empty piece tree
    #[inline]
    pub fn new(eol: EndOfLine) -> PieceTree {
        Self::assemble(Buffers::new(), Tree::new(), eol, true)
    }

    /// Create a piece tree from a reader. The content is stored in memory
    /// as one original buffer.
    pub fn from_reader<R: Read>(mut reader: R, eol: EndOfLine) -> io::Result<PieceTree> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        let mut builder = PieceTreeBuilder::new();
        builder.eol(eol);
        builder.push_chunk(&text);
        Ok(builder.build())
    }

    pub(crate) fn assemble(
        buffers: Buffers,
        tree: Tree,
        eol: EndOfLine,
        eol_normalized: bool,
    ) -> PieceTree {
        let mut pt = PieceTree {
            buffers,
            tree,
            len: 0,
            line_count: 1,
            eol,
            eol_normalized,
            search_cache: RefCell::new(SearchCache::new(SEARCH_CACHE_LIMIT)),
            visited_line: RefCell::new(None),
        };
        pt.update_metadata();
        pt
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    #[inline]
    pub fn piece_count(&self) -> usize {
        self.tree.node_count
    }

    #[inline]
    pub fn eol(&self) -> EndOfLine {
        self.eol
    }

    /// Whether every line terminator currently matches [`eol`](Self::eol).
    #[inline]
    pub fn eol_normalized(&self) -> bool {
        self.eol_normalized
    }

    /// Insert text at a byte offset. An offset past the end appends.
    ///
    /// `eol_normalized` declares that every terminator in `text` already
    /// matches the tree's line ending; it can only ever turn the tree's
    /// own flag off.
    pub fn insert(&mut self, offset: usize, text: &str, eol_normalized: bool) {
        self.eol_normalized = self.eol_normalized && eol_normalized;
        self.visited_line.borrow_mut().take();

        if text.is_empty() {
            return;
        }

        let mut offset = offset.min(self.len);
        self.search_cache
            .borrow_mut()
            .invalidate(offset.saturating_sub(1));

        let mut bytes = text.as_bytes().to_vec();

        if self.should_check_crlf() {
            if bytes[bytes.len() - 1] == b'\r' && self.byte_at(offset) == Some(b'\n') {
                // The new text would leave its trailing \r right before
                // this \n. Pull the \n into the text so the pair stays in
                // one piece.
                self.tree.remove(offset..offset + 1, &self.buffers);
                bytes.push(b'\n');
            }
            if bytes[0] == b'\n' && offset > 0 && self.byte_at(offset - 1) == Some(b'\r') {
                // Mirror case: pull the preceding \r in front of the text.
                self.tree.remove(offset - 1..offset, &self.buffers);
                bytes.insert(0, b'\r');
                offset -= 1;
            }
        }

        if bytes.len() > AVERAGE_BUFFER_SIZE {
            log::debug!("chunking a {} byte insert into read-only buffers", bytes.len());
            let mut pos = offset;
            for chunk in chunk_splits(&bytes) {
                let piece = self.buffers.push_original(chunk.to_vec());
                let piece_len = piece.len;
                self.tree.insert(pos, piece, &self.buffers);
                pos += piece_len;
            }
        } else if bytes.len() < AVERAGE_BUFFER_SIZE && self.can_append_at(offset) {
            // Append fast path: the piece ending here also ends the change
            // buffer, extend it in place.
            let new_end = self.buffers.append_extending(&bytes);
            self.tree.extend(offset, new_end, &self.buffers);
        } else {
            let piece = self.buffers.append_fresh(&bytes);
            self.tree.insert(offset, piece, &self.buffers);
        }

        self.update_metadata();
    }

    /// Delete `count` bytes starting at a byte offset. Deleting nothing,
    /// or from an empty tree, is a no-op.
    pub fn delete(&mut self, offset: usize, count: usize) {
        self.visited_line.borrow_mut().take();

        if count == 0 || self.len == 0 || offset >= self.len {
            return;
        }

        let count = count.min(self.len - offset);
        self.search_cache
            .borrow_mut()
            .invalidate(offset.saturating_sub(1));

        self.tree.remove(offset..offset + count, &self.buffers);

        if self.should_check_crlf() {
            self.repair_crlf_join(offset);
        }

        self.update_metadata();
    }

    /// Rewrite every line terminator to the given ending. Rebuilds the
    /// tree over freshly chunked read-only buffers.
    pub fn set_eol(&mut self, eol: EndOfLine) {
        self.eol = eol;
        self.normalize_eol();
    }

    /// Content of the byte range `[start, end)`.
    pub fn value_in_range(&self, start: usize, end: usize) -> String {
        lines::into_string(self.bytes_in_range(start, end))
    }

    /// Content of the byte range with every line break rewritten to `eol`.
    pub fn value_in_range_with_eol(&self, start: usize, end: usize, eol: EndOfLine) -> String {
        lines::into_string(eol::rewrite_breaks(&self.bytes_in_range(start, end), eol))
    }

    /// All lines of the document, without their terminators.
    pub fn lines_content(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.line_count);
        let mut current = Vec::new();

        let mut iter = PieceIter::new(&self.tree, self.len, 0);
        let mut cur = iter.get();
        while let Some((_, piece)) = cur {
            lines::push_lines(self.buffers.piece_bytes(&piece), &mut current, &mut out);
            cur = iter.next();
        }

        out.push(lines::into_string(current));
        out
    }

    /// Content of a 1-based line, without its terminator. Lines past the
    /// end clamp to the last line.
    pub fn line_content(&self, line_number: usize) -> String {
        let line = line_number.clamp(1, self.line_count);

        if let Some((cached, content)) = &*self.visited_line.borrow() {
            if *cached == line {
                return content.clone();
            }
        }

        let start = self.line_start_offset(line);
        let mut raw = if line == self.line_count {
            self.bytes_in_range(start, self.len)
        } else {
            let end = self.line_start_offset(line + 1);
            self.bytes_in_range(start, end)
        };

        if line < self.line_count {
            let trimmed = lines::trim_trailing_break(&raw).len();
            raw.truncate(trimmed);
        }

        let content = lines::into_string(raw);
        *self.visited_line.borrow_mut() = Some((line, content.clone()));
        content
    }

    /// Byte length of a line, terminator excluded.
    pub fn line_length(&self, line_number: usize) -> usize {
        let line = line_number.clamp(1, self.line_count);

        if line == self.line_count {
            return self.len - self.line_start_offset(line);
        }

        if self.eol_normalized {
            self.line_start_offset(line + 1) - self.line_start_offset(line) - self.eol.len()
        } else {
            self.line_content(line).len()
        }
    }

    /// Byte at the 0-based `index` of a line. An index at the line length
    /// peeks the first byte of the terminator; past the end of the
    /// document the result is 0.
    pub fn line_char_code(&self, line_number: usize, index: usize) -> u8 {
        let offset = self.offset_at(line_number, index + 1);
        self.byte_at(offset).unwrap_or(0)
    }

    /// Byte offset of a 1-based (line, column) coordinate. The line clamps
    /// to the document, the result to the document length.
    pub fn offset_at(&self, line_number: usize, column: usize) -> usize {
        let line = line_number.clamp(1, self.line_count);
        let start = self.line_start_offset(line);
        (start + column.max(1) - 1).min(self.len)
    }

    /// 1-based (line, column) of a byte offset. Offsets clamp to
    /// `[0, len]`.
    pub fn position_at(&self, offset: usize) -> (usize, usize) {
        let original = offset.min(self.len);

        let hit = self.search_cache.borrow().get_with_lines(original).cloned();
        if let Some(entry) = hit {
            let (index, remainder) = self.index_of(&entry.piece, original - entry.start_offset);
            let line = entry.lf_before.unwrap() + index + 1;
            if index == 0 {
                let line_start = self.line_start_offset(line);
                return (line, original - line_start + 1);
            }
            return (line, remainder + 1);
        }

        let mut offset = original;
        let mut lf_acc = 0;
        let mut node_start = 0;
        let mut node = self.tree.root.as_ref();

        while let Node::Internal(n) = node {
            if n.left_stats.bytes != 0 && n.left_stats.bytes >= offset {
                node = n.left.as_ref();
            } else if n.left_stats.bytes + n.piece.len >= offset {
                let (index, remainder) = self.index_of(&n.piece, offset - n.left_stats.bytes);
                let lf_before = lf_acc + n.left_stats.line_feeds;
                let line = lf_before + index + 1;

                self.search_cache.borrow_mut().set(CacheEntry {
                    piece: n.piece.clone(),
                    start_offset: node_start + n.left_stats.bytes,
                    lf_before: Some(lf_before),
                });

                if index == 0 {
                    let line_start = self.line_start_offset(line);
                    return (line, original - line_start + 1);
                }
                return (line, remainder + 1);
            } else {
                offset -= n.left_stats.bytes + n.piece.len;
                lf_acc += n.left_stats.line_feeds + n.piece.line_feeds;
                node_start += n.left_stats.bytes + n.piece.len;

                if n.right.is_leaf() {
                    let line = lf_acc + 1;
                    let line_start = self.line_start_offset(line);
                    return (line, original - offset - line_start + 1);
                }
                node = n.right.as_ref();
            }
        }

        (1, 1)
    }

    /// Take a snapshot of the current content as a pull-based stream of
    /// string chunks, prefixed with `bom`.
    pub fn snapshot(&self, bom: &str) -> Snapshot<'_> {
        Snapshot::new(self, bom)
    }

    fn update_metadata(&mut self) {
        let stats = self.tree.stats();
        self.len = stats.bytes;
        self.line_count = stats.line_feeds + 1;
    }

    /// CRLF boundaries need no repair once the document is known to only
    /// contain `\n` terminators.
    fn should_check_crlf(&self) -> bool {
        !(self.eol_normalized && self.eol == EndOfLine::Lf)
    }

    /// After a delete at `offset`, a `\r` ending one piece may have become
    /// adjacent to a `\n` starting the next. Rebuild the pair as a single
    /// piece so line counting stays right.
    fn repair_crlf_join(&mut self, offset: usize) {
        let total = self.tree.stats().bytes;
        if offset == 0 || offset >= total {
            return;
        }

        let splits_pair = {
            let (stack, piece_start) = self.tree.find_node(offset - 1);
            match stack.last() {
                Some(n) => {
                    piece_start + n.piece.len == offset
                        && self.buffers.piece_bytes(&n.piece).last() == Some(&b'\r')
                }
                None => false,
            }
        } && self.byte_at(offset) == Some(b'\n');

        if !splits_pair {
            return;
        }

        self.tree.remove(offset - 1..offset + 1, &self.buffers);
        let piece = self.buffers.append_fresh(b"\r\n");
        self.tree.insert(offset - 1, piece, &self.buffers);
    }

    /// Whether an insert at `offset` may extend the piece ending there in
    /// place: the piece must end the change buffer and the text appended
    /// after it stays contiguous.
    fn can_append_at(&self, offset: usize) -> bool {
        if offset == 0 {
            return false;
        }

        match self.lookup(offset) {
            Some(np) => {
                np.remainder == np.piece.len
                    && np.piece.buffer == CHANGE_BUFFER
                    && self.buffers.offset(CHANGE_BUFFER, np.piece.end) == self.buffers.change_len()
            }
            None => false,
        }
    }

    /// Piece covering a document offset. At a boundary the piece ending
    /// there wins when it lies on the descent path, mirroring the append
    /// fast path's needs. Uncached; used while editing.
    fn lookup(&self, mut offset: usize) -> Option<NodePosition> {
        let mut node = self.tree.root.as_ref();
        let mut node_start = 0;

        while let Node::Internal(n) = node {
            if n.left_stats.bytes > offset {
                node = n.left.as_ref();
            } else if n.left_stats.bytes + n.piece.len >= offset {
                return Some(NodePosition {
                    piece: n.piece.clone(),
                    remainder: offset - n.left_stats.bytes,
                    start_offset: node_start + n.left_stats.bytes,
                });
            } else {
                offset -= n.left_stats.bytes + n.piece.len;
                node_start += n.left_stats.bytes + n.piece.len;
                node = n.right.as_ref();
            }
        }

        None
    }

    /// Byte at a document offset, `None` at or past the end.
    fn byte_at(&self, offset: usize) -> Option<u8> {
        let (stack, piece_start) = self.tree.find_node(offset);
        let n = stack.last()?;

        let in_piece = offset - piece_start;
        if in_piece >= n.piece.len {
            return None;
        }

        let buffer_offset = self.buffers.offset(n.piece.buffer, n.piece.start) + in_piece;
        Some(self.buffers.byte(n.piece.buffer, buffer_offset))
    }

    /// Byte offset at which a 1-based line starts.
    fn line_start_offset(&self, line_number: usize) -> usize {
        if line_number <= 1 {
            return 0;
        }

        let hit = self.search_cache.borrow().get_by_line(line_number).cloned();
        if let Some(entry) = hit {
            let lf_before = entry.lf_before.unwrap();
            let index = line_number as isize - lf_before as isize - 2;
            return entry.start_offset + self.buffers.accumulated_value(&entry.piece, index);
        }

        let mut line = line_number;
        let mut left_len = 0;
        let mut lf_acc = 0;
        let mut node = self.tree.root.as_ref();

        while let Node::Internal(n) = node {
            if !n.left.is_leaf() && n.left_stats.line_feeds + 1 >= line {
                node = n.left.as_ref();
            } else if n.left_stats.line_feeds + n.piece.line_feeds + 1 >= line {
                let start_offset = left_len + n.left_stats.bytes;
                let lf_before = lf_acc + n.left_stats.line_feeds;
                let index = line as isize - n.left_stats.line_feeds as isize - 2;
                let acc = self.buffers.accumulated_value(&n.piece, index);

                self.search_cache.borrow_mut().set(CacheEntry {
                    piece: n.piece.clone(),
                    start_offset,
                    lf_before: Some(lf_before),
                });

                return start_offset + acc;
            } else {
                line -= n.left_stats.line_feeds + n.piece.line_feeds;
                lf_acc += n.left_stats.line_feeds + n.piece.line_feeds;
                left_len += n.left_stats.bytes + n.piece.len;
                node = n.right.as_ref();
            }
        }

        left_len
    }

    /// How many intra-piece lines precede the piece-local offset
    /// `remainder`, and the column where it lands. When the offset sits at
    /// the piece end just past a dangling `\r`, the recomputed line feed
    /// count wins and the position snaps to the start of the next line.
    fn index_of(&self, piece: &Piece, remainder: usize) -> (usize, usize) {
        let start_offset = self.buffers.offset(piece.buffer, piece.start);
        let pos = self.buffers.cursor_at(piece.buffer, start_offset + remainder);
        let line_cnt = pos.line - piece.start.line;

        if self.buffers.offset(piece.buffer, piece.end) - start_offset == remainder {
            let real = self.buffers.line_feeds_between(piece.buffer, piece.start, pos);
            if real != line_cnt {
                return (real, 0);
            }
        }

        (line_cnt, pos.column)
    }

    fn bytes_in_range(&self, start: usize, end: usize) -> Vec<u8> {
        let end = end.min(self.len);
        let start = start.min(end);
        let mut out = Vec::with_capacity(end - start);

        if start == end {
            return out;
        }

        let mut iter = PieceIter::new(&self.tree, self.len, start);
        let mut cur = iter.get();
        while let Some((piece_start, piece)) = cur {
            if piece_start >= end {
                break;
            }

            let bytes = self.buffers.piece_bytes(&piece);
            let from = start.saturating_sub(piece_start);
            let to = bytes.len().min(end - piece_start);
            out.extend_from_slice(&bytes[from..to]);

            cur = iter.next();
        }

        out
    }

    /// Rewrite the whole document to the current line ending and rebuild
    /// the tree over chunked read-only buffers.
    fn normalize_eol(&mut self) {
        let min = AVERAGE_BUFFER_SIZE * 2 / 3;
        let max = AVERAGE_BUFFER_SIZE * 2;

        let mut chunks: Vec<Vec<u8>> = Vec::new();
        let mut chunk: Vec<u8> = Vec::new();

        let mut iter = PieceIter::new(&self.tree, self.len, 0);
        let mut cur = iter.get();
        while let Some((_, piece)) = cur {
            let bytes = self.buffers.piece_bytes(&piece);
            if !(chunk.len() <= min || chunk.len() + bytes.len() < max) {
                chunks.push(mem::take(&mut chunk));
            }
            chunk.extend_from_slice(bytes);
            cur = iter.next();
        }
        if !chunk.is_empty() {
            chunks.push(chunk);
        }

        let mut buffers = Buffers::new();
        let mut tree = Tree::new();
        let mut pos = 0;

        for chunk in chunks {
            let piece = buffers.push_original(eol::rewrite_breaks(&chunk, self.eol));
            let piece_len = piece.len;
            tree.insert(pos, piece, &buffers);
            pos += piece_len;
        }

        log::debug!("normalized document to {:?}, {} bytes", self.eol, pos);

        self.buffers = buffers;
        self.tree = tree;
        self.eol_normalized = true;
        self.search_cache.borrow_mut().clear();
        self.visited_line.borrow_mut().take();
        self.update_metadata();
    }
}

/// Split an oversized insert into chunks that each fit one read-only
/// buffer, never cutting a `\r\n` pair or a UTF-8 sequence in half.
fn chunk_splits(bytes: &[u8]) -> Vec<&[u8]> {
    let mut chunks = Vec::new();
    let mut rest = bytes;

    while rest.len() > AVERAGE_BUFFER_SIZE {
        let mut end = AVERAGE_BUFFER_SIZE;
        while end > 0 && rest[end] & 0xc0 == 0x80 {
            end -= 1;
        }
        if end > 0 && rest[end - 1] == b'\r' && rest[end] == b'\n' {
            end -= 1;
        }
        if end == 0 {
            // Degenerate input, fall back to a hard cut.
            end = AVERAGE_BUFFER_SIZE;
        }

        chunks.push(&rest[..end]);
        rest = &rest[end..];
    }

    if !rest.is_empty() {
        chunks.push(rest);
    }

    chunks
}

impl PartialEq for PieceTree {
    /// Content equality, compared piece chunk by piece chunk.
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }

        let mut ia = PieceIter::new(&self.tree, self.len, 0);
        let mut ib = PieceIter::new(&other.tree, other.len, 0);
        let mut pa = ia.get();
        let mut pb = ib.get();
        let mut sa: &[u8] = &[];
        let mut sb: &[u8] = &[];

        loop {
            if sa.is_empty() {
                if let Some((_, piece)) = pa.take() {
                    sa = self.buffers.piece_bytes(&piece);
                    pa = ia.next();
                }
            }
            if sb.is_empty() {
                if let Some((_, piece)) = pb.take() {
                    sb = other.buffers.piece_bytes(&piece);
                    pb = ib.next();
                }
            }

            let n = sa.len().min(sb.len());
            if n == 0 {
                // Equal lengths: both streams run dry together.
                return true;
            }
            if sa[..n] != sb[..n] {
                return false;
            }

            sa = &sa[n..];
            sb = &sb[n..];
        }
    }
}

impl From<&PieceTree> for String {
    fn from(pt: &PieceTree) -> Self {
        pt.value_in_range(0, pt.len)
    }
}

impl Default for PieceTree {
    fn default() -> Self {
        PieceTree::new(EndOfLine::Lf)
    }
}

#[cfg(test)]
mod test {
    use std::io;

    use rand_chacha::rand_core::{RngCore, SeedableRng};

    use super::tree::test::is_valid_tree;
    use super::*;

    fn content(pt: &PieceTree) -> String {
        String::from(pt)
    }

    fn assert_valid(pt: &PieceTree) {
        assert_eq!(Ok(()), is_valid_tree(&pt.tree, &pt.buffers));
        let stats = pt.tree.stats();
        assert_eq!(stats.bytes, pt.len);
        assert_eq!(stats.line_feeds + 1, pt.line_count);
    }

    /// No `\r` ending one piece may be followed by a `\n` starting the
    /// next.
    fn assert_crlf_unity(pt: &PieceTree) {
        let mut iter = PieceIter::new(&pt.tree, pt.len, 0);
        let mut prev_ends_cr = false;
        let mut cur = iter.get();

        while let Some((_, piece)) = cur {
            let bytes = pt.buffers.piece_bytes(&piece);
            assert!(
                !(prev_ends_cr && bytes.first() == Some(&b'\n')),
                "a \\r\\n pair straddles two pieces"
            );
            prev_ends_cr = bytes.last() == Some(&b'\r');
            cur = iter.next();
        }
    }

    fn model_line_count(bytes: &[u8]) -> usize {
        let mut count = 1;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' => {
                    count += 1;
                    if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                        i += 1;
                    }
                }
                b'\n' => count += 1,
                _ => {}
            }
            i += 1;
        }
        count
    }

    #[test]
    fn insert_splits_piece() {
        let mut builder = PieceTreeBuilder::new();
        builder.eol_normalized(true);
        builder.push_chunk("hello world");
        let mut pt = builder.build();

        pt.insert(5, " there", true);

        assert_eq!(vec!["hello there world"], pt.lines_content());
        assert_eq!(17, pt.len());
        assert_eq!(1, pt.line_count());
        assert_eq!(3, pt.piece_count());
        assert_valid(&pt);
    }

    #[test]
    fn crlf_insert_at_piece_boundary() {
        let mut pt = PieceTree::new(EndOfLine::CrLf);
        pt.insert(0, "a\r", false);
        pt.insert(2, "\nb", false);

        assert_eq!(vec!["a", "b"], pt.lines_content());
        assert_eq!(2, pt.line_count());
        assert_eq!("a\r\nb", content(&pt));
        assert_crlf_unity(&pt);
        assert_valid(&pt);
    }

    #[test]
    fn append_fast_path_keeps_one_piece() {
        let mut pt = PieceTree::new(EndOfLine::Lf);
        pt.insert(0, "abc", true);
        pt.insert(3, "def", true);
        pt.insert(6, "ghi", true);

        assert_eq!(1, pt.piece_count());
        assert_eq!(vec!["abcdefghi"], pt.lines_content());
        assert_eq!(9, pt.len());
        assert_valid(&pt);
    }

    #[test]
    fn large_insert_chunks_without_splitting_crlf() {
        let mut text = "a".repeat(65534);
        text.push_str("\r\n");
        text.push_str(&"b".repeat(200_000 - text.len()));

        let mut pt = PieceTree::new(EndOfLine::CrLf);
        pt.insert(0, &text, false);

        assert_eq!(200_000, pt.len());
        assert_eq!(2, pt.line_count());
        assert_eq!(4, pt.piece_count());
        assert_eq!(65534, pt.line_length(1));
        assert_eq!(200_000 - 65536, pt.line_length(2));
        assert_eq!(b'\r', pt.line_char_code(1, 65534));
        assert_crlf_unity(&pt);
        assert_valid(&pt);
    }

    #[test]
    fn delete_across_pieces() {
        let mut builder = PieceTreeBuilder::new();
        builder.push_chunk("foo\n");
        builder.push_chunk("bar\n");
        builder.push_chunk("baz");
        let mut pt = builder.build();
        assert_eq!(3, pt.piece_count());

        pt.delete(2, 7);

        assert_eq!("foaz", content(&pt));
        assert_eq!(1, pt.line_count());
        assert_eq!(4, pt.len());
        assert_valid(&pt);
    }

    #[test]
    fn set_eol_normalizes_mixed_endings() {
        let mut builder = PieceTreeBuilder::new();
        builder.eol(EndOfLine::CrLf);
        builder.push_chunk("a\r\nb\nc\rd");
        let mut pt = builder.build();
        assert!(!pt.eol_normalized());

        pt.set_eol(EndOfLine::Lf);

        assert_eq!("a\nb\nc\nd", content(&pt));
        assert_eq!(4, pt.line_count());
        assert!(pt.eol_normalized());
        assert_eq!("a\nb\nc\nd", pt.value_in_range(0, pt.len()));
        assert_valid(&pt);

        // Normalizing again changes nothing.
        pt.set_eol(EndOfLine::Lf);
        assert_eq!("a\nb\nc\nd", content(&pt));
        assert_eq!(4, pt.line_count());

        pt.set_eol(EndOfLine::CrLf);
        assert_eq!("a\r\nb\r\nc\r\nd", content(&pt));
        assert_eq!(4, pt.line_count());
        assert_valid(&pt);
    }

    #[test]
    fn delete_rejoins_split_crlf() {
        let mut pt = PieceTree::new(EndOfLine::CrLf);
        pt.insert(0, "a\rX\nb", false);
        assert_eq!(3, pt.line_count());

        pt.delete(2, 1);

        assert_eq!("a\r\nb", content(&pt));
        assert_eq!(2, pt.line_count());
        assert_eq!(vec!["a", "b"], pt.lines_content());
        assert_crlf_unity(&pt);
        assert_valid(&pt);
    }

    #[test]
    fn insert_between_crlf_separates_pair() {
        let mut pt = PieceTree::new(EndOfLine::CrLf);
        pt.insert(0, "a\r\nb", false);
        assert_eq!(2, pt.line_count());

        pt.insert(2, "x", false);

        assert_eq!("a\rx\nb", content(&pt));
        assert_eq!(3, pt.line_count());
        assert_eq!(vec!["a", "x", "b"], pt.lines_content());
        assert_valid(&pt);
    }

    #[test]
    fn insert_steals_following_lf() {
        let mut pt = PieceTree::new(EndOfLine::CrLf);
        pt.insert(0, "a\nb", false);

        pt.insert(1, "q\r", false);

        assert_eq!("aq\r\nb", content(&pt));
        assert_eq!(2, pt.line_count());
        assert_crlf_unity(&pt);
        assert_valid(&pt);
    }

    #[test]
    fn change_buffer_filler_keeps_breaks_apart() {
        let mut pt = PieceTree::new(EndOfLine::CrLf);
        pt.insert(0, "x\r", false);
        pt.insert(0, "\ny", false);

        assert_eq!("\nyx\r", content(&pt));
        assert_eq!(3, pt.line_count());
        assert_eq!(vec!["", "yx", ""], pt.lines_content());
        // x \r _ \n y: the filler byte sits between the two appends.
        assert_eq!(5, pt.buffers.change_len());
        assert_valid(&pt);
    }

    #[test]
    fn line_queries_mixed_endings() {
        let mut pt = PieceTree::new(EndOfLine::CrLf);
        pt.insert(0, "ab\ncde\r\nf\rg", false);

        assert_eq!(4, pt.line_count());
        assert_eq!(vec!["ab", "cde", "f", "g"], pt.lines_content());
        assert_eq!("cde", pt.line_content(2));
        assert_eq!("g", pt.line_content(4));
        assert_eq!("g", pt.line_content(99));

        assert_eq!(2, pt.line_length(1));
        assert_eq!(3, pt.line_length(2));
        assert_eq!(1, pt.line_length(3));
        assert_eq!(1, pt.line_length(4));

        assert_eq!((1, 1), pt.position_at(0));
        assert_eq!((2, 1), pt.position_at(3));
        assert_eq!((2, 4), pt.position_at(6));
        assert_eq!((3, 1), pt.position_at(8));
        assert_eq!((4, 1), pt.position_at(10));
        assert_eq!((4, 2), pt.position_at(11));
        assert_eq!((4, 2), pt.position_at(999));

        assert_eq!(3, pt.offset_at(2, 1));
        assert_eq!(6, pt.offset_at(2, 4));
        assert_eq!(11, pt.offset_at(4, 2));
        assert_eq!(11, pt.offset_at(99, 99));

        assert_eq!(b'a', pt.line_char_code(1, 0));
        assert_eq!(b'\n', pt.line_char_code(1, 2));
        assert_eq!(b'\r', pt.line_char_code(2, 3));
        assert_eq!(0, pt.line_char_code(4, 1));
    }

    #[test]
    fn value_in_range_with_eol_rewrite() {
        let mut pt = PieceTree::new(EndOfLine::CrLf);
        pt.insert(0, "ab\ncde\r\nf\rg", false);

        assert_eq!("b\ncde\r\nf", pt.value_in_range(1, 9));
        assert_eq!("b\ncde\nf", pt.value_in_range_with_eol(1, 9, EndOfLine::Lf));
        assert_eq!("", pt.value_in_range(4, 4));
        assert_eq!("g", pt.value_in_range(10, 999));
    }

    #[test]
    fn empty_tree_queries() {
        let pt = PieceTree::new(EndOfLine::Lf);

        assert_eq!(0, pt.len());
        assert!(pt.is_empty());
        assert_eq!(1, pt.line_count());
        assert_eq!(vec![""], pt.lines_content());
        assert_eq!("", pt.line_content(1));
        assert_eq!(0, pt.line_length(1));
        assert_eq!((1, 1), pt.position_at(5));
        assert_eq!(0, pt.offset_at(3, 7));
        assert_eq!(0, pt.line_char_code(1, 0));
    }

    #[test]
    fn insert_past_end_appends() {
        let mut pt = PieceTree::new(EndOfLine::Lf);
        pt.insert(0, "ab", true);
        pt.insert(999, "c", true);

        assert_eq!("abc", content(&pt));
    }

    #[test]
    fn no_fast_path_after_tail_delete() {
        let mut pt = PieceTree::new(EndOfLine::Lf);
        pt.insert(0, "abc", true);
        pt.delete(2, 1);
        pt.insert(2, "z", true);

        assert_eq!("abz", content(&pt));
        assert_eq!(2, pt.piece_count());
        assert_valid(&pt);
    }

    #[test]
    fn delete_everything() {
        let mut pt = PieceTree::new(EndOfLine::Lf);
        pt.insert(0, "some\nlines\nhere", true);
        pt.delete(0, pt.len());

        assert_eq!(0, pt.len());
        assert_eq!(1, pt.line_count());
        assert_eq!(0, pt.piece_count());
        assert_eq!(vec![""], pt.lines_content());
        assert_valid(&pt);
    }

    #[test]
    fn from_reader_builds_single_buffer() {
        let pt = PieceTree::from_reader(io::Cursor::new("one\ntwo"), EndOfLine::Lf).unwrap();

        assert_eq!("one\ntwo", content(&pt));
        assert_eq!(2, pt.line_count());
        assert_eq!(1, pt.piece_count());
    }

    #[test]
    fn content_equality() {
        let mut builder = PieceTreeBuilder::new();
        builder.push_chunk("shared\ncontent");
        let a = builder.build();

        let mut b = PieceTree::new(EndOfLine::Lf);
        b.insert(0, "content", true);
        b.insert(0, "shared\n", true);

        assert_eq!(a, b);

        let mut c = PieceTree::new(EndOfLine::Lf);
        c.insert(0, "shared\ncontenT", true);
        assert_ne!(a, c);
    }

    #[test]
    fn snapshot_streams_pieces() {
        let mut pt = PieceTree::new(EndOfLine::Lf);
        pt.insert(0, "tail", true);
        pt.insert(0, "head\n", true);
        assert_eq!(2, pt.piece_count());

        let mut snapshot = pt.snapshot("\u{feff}");
        let mut collected = String::new();
        let mut chunks = 0;
        while let Some(chunk) = snapshot.read() {
            collected.push_str(&chunk);
            chunks += 1;
        }

        assert_eq!(2, chunks);
        assert_eq!("\u{feff}head\ntail", collected);

        // An empty tree still yields the BOM once.
        let empty = PieceTree::new(EndOfLine::Lf);
        let mut snapshot = empty.snapshot("\u{feff}");
        assert_eq!(Some("\u{feff}".to_string()), snapshot.read());
        assert_eq!(None, snapshot.read());
    }

    #[test]
    fn repeated_lookups_match_cold_lookups() {
        let mut pt = PieceTree::new(EndOfLine::CrLf);
        pt.insert(0, "one\r\ntwo\r\nthree\r\nfour", false);
        pt.insert(10, "2.5\r\n", false);

        // First call descends, the second may be served from a cache.
        for _ in 0..2 {
            assert_eq!("two", pt.line_content(2));
            assert_eq!("2.5", pt.line_content(3));
            assert_eq!(5, pt.offset_at(2, 1));
            assert_eq!((2, 2), pt.position_at(6));
        }

        pt.delete(5, 5);
        for _ in 0..2 {
            assert_eq!("2.5", pt.line_content(2));
            assert_eq!(5, pt.offset_at(2, 1));
            assert_eq!((2, 2), pt.position_at(6));
        }
        assert_valid(&pt);
    }

    #[test]
    fn randomized_edits_match_reference() {
        let texts: &[&str] = &[
            "a", "bc", "x\n", "\r\n", "\r", "\n", "hello\r\nworld", "q\rw", "line\n",
        ];

        for seed in 0..4 {
            let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
            let mut pt = PieceTree::new(EndOfLine::Lf);
            let mut model: Vec<u8> = Vec::new();

            for round in 0..250 {
                let op = rng.next_u32() % 10;
                if op < 6 {
                    let pos = (rng.next_u64() % (model.len() as u64 + 1)) as usize;
                    let text = texts[(rng.next_u32() as usize) % texts.len()];
                    pt.insert(pos, text, false);
                    model.splice(pos..pos, text.bytes());
                } else if !model.is_empty() {
                    let pos = (rng.next_u64() % model.len() as u64) as usize;
                    let count = (rng.next_u32() % 8) as usize;
                    let end = (pos + count).min(model.len());
                    pt.delete(pos, count);
                    model.drain(pos..end);
                }

                assert_eq!(model.len(), pt.len(), "length diverged in round {round}");
                assert_eq!(
                    String::from_utf8_lossy(&model),
                    content(&pt),
                    "content diverged in round {round}"
                );
                assert_eq!(
                    model_line_count(&model),
                    pt.line_count(),
                    "line count diverged in round {round}"
                );
                assert_valid(&pt);
                assert_crlf_unity(&pt);

                // Coordinate round trips at a random spot.
                let offset = (rng.next_u64() % (model.len() as u64 + 1)) as usize;
                let (line, column) = pt.position_at(offset);
                assert_eq!(offset, pt.offset_at(line, column));

                let line = (rng.next_u64() % pt.line_count() as u64) as usize + 1;
                let column = (rng.next_u64() % (pt.line_length(line) as u64 + 1)) as usize + 1;
                let offset = pt.offset_at(line, column);
                assert_eq!((line, column), pt.position_at(offset));
            }
        }
    }
}
