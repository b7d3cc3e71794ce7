use crate::piece_tree::tree::piece::Piece;

/// One remembered lookup: a piece value plus where it starts in the
/// document. `lf_before` is filled in by line-aware lookups and lets a hit
/// answer line queries without another descent.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub(crate) piece: Piece,
    pub(crate) start_offset: usize,
    /// Line feeds in the document before the piece start, when known.
    pub(crate) lf_before: Option<usize>,
}

/// Bounded LIFO of recent position lookups. Entries are only trusted
/// between edits: every edit drops the entries at or past the edited
/// boundary, so a surviving entry always describes a piece that has
/// neither moved nor been rewritten.
#[derive(Debug)]
pub(crate) struct SearchCache {
    limit: usize,
    entries: Vec<CacheEntry>,
}

impl SearchCache {
    pub fn new(limit: usize) -> SearchCache {
        SearchCache {
            limit,
            entries: Vec::with_capacity(limit),
        }
    }

    /// Entry whose piece covers the document offset and knows its line
    /// position, newest first.
    pub fn get_with_lines(&self, offset: usize) -> Option<&CacheEntry> {
        self.entries.iter().rev().find(|e| {
            e.lf_before.is_some()
                && e.start_offset <= offset
                && offset <= e.start_offset + e.piece.len
        })
    }

    /// Entry whose piece contains the start of the given 1-based document
    /// line.
    pub fn get_by_line(&self, line: usize) -> Option<&CacheEntry> {
        self.entries.iter().rev().find(|e| match e.lf_before {
            Some(lf_before) => {
                lf_before + 1 < line && line <= lf_before + 1 + e.piece.line_feeds
            }
            None => false,
        })
    }

    pub fn set(&mut self, entry: CacheEntry) {
        if self.entries.len() >= self.limit {
            self.entries.remove(0);
        }
        self.entries.push(entry);
    }

    /// Drop every entry an edit at `from` could have moved, renumbered or
    /// rewritten. Entries ending strictly before `from` are untouched by
    /// construction and stay.
    pub fn invalidate(&mut self, from: usize) {
        self.entries
            .retain(|e| e.start_offset + e.piece.len < from);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
