use std::mem;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::piece_tree::buffers::{BufferCursor, Buffers};

/// Byte length and line feed count of a piece or a subtree. The tree keeps
/// one `Stats` per node for its left subtree so lookups can descend by
/// either byte offset or line number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Stats {
    pub(crate) bytes: usize,
    pub(crate) line_feeds: usize,
}

impl Stats {
    pub fn new(bytes: usize, line_feeds: usize) -> Stats {
        Stats { bytes, line_feeds }
    }
}

impl Add for Stats {
    type Output = Stats;

    fn add(self, rhs: Stats) -> Stats {
        Stats {
            bytes: self.bytes + rhs.bytes,
            line_feeds: self.line_feeds + rhs.line_feeds,
        }
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, rhs: Stats) {
        self.bytes += rhs.bytes;
        self.line_feeds += rhs.line_feeds;
    }
}

impl Sub for Stats {
    type Output = Stats;

    fn sub(self, rhs: Stats) -> Stats {
        Stats {
            bytes: self.bytes - rhs.bytes,
            line_feeds: self.line_feeds - rhs.line_feeds,
        }
    }
}

impl SubAssign for Stats {
    fn sub_assign(&mut self, rhs: Stats) {
        self.bytes -= rhs.bytes;
        self.line_feeds -= rhs.line_feeds;
    }
}

/// Piece describes a substring of one backing buffer.
///
/// The endpoints are stored as (line, column) cursors into the buffer so
/// that the line feed count of any sub-range can be derived from the
/// buffer's line start table instead of rescanning bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Piece {
    /// Index into the buffer store. 0 is the append-only change buffer.
    pub(crate) buffer: usize,

    pub(crate) start: BufferCursor,
    pub(crate) end: BufferCursor,

    /// Length in bytes
    pub(crate) len: usize,
    /// Line breaks terminated inside this piece. A `\r\n` pair counts once,
    /// and a trailing `\r` whose `\n` lies just past the piece counts too.
    pub(crate) line_feeds: usize,
}

impl Piece {
    pub fn new(
        buffer: usize,
        start: BufferCursor,
        end: BufferCursor,
        len: usize,
        line_feeds: usize,
    ) -> Piece {
        Piece {
            buffer,
            start,
            end,
            len,
            line_feeds,
        }
    }

    #[inline]
    pub fn stats(&self) -> Stats {
        Stats::new(self.len, self.line_feeds)
    }

    /// Split the piece at a byte offset from the piece start.
    /// Modifies the current piece to be the left half and returns the right
    /// half. Both halves get their line feed counts recomputed; the counts
    /// need not sum to the original when the cut lands inside a `\r\n` pair.
    pub fn split_left(&mut self, offset: usize, buffers: &Buffers) -> Piece {
        debug_assert!(
            offset <= self.len,
            "split_left: offset {} over piece len {}",
            offset,
            self.len
        );

        let start_offset = buffers.offset(self.buffer, self.start);
        let mid = buffers.cursor_at(self.buffer, start_offset + offset);

        let right = Piece {
            buffer: self.buffer,
            start: mid,
            end: self.end,
            len: self.len - offset,
            line_feeds: buffers.line_feeds_between(self.buffer, mid, self.end),
        };

        self.end = mid;
        self.len = offset;
        self.line_feeds = buffers.line_feeds_between(self.buffer, self.start, mid);

        right
    }

    /// Split the piece at a byte offset from the piece start.
    /// Modifies the current piece to be the right half and returns the left
    /// half.
    pub fn split_right(&mut self, offset: usize, buffers: &Buffers) -> Piece {
        let right = self.split_left(offset, buffers);
        mem::replace(self, right)
    }
}
