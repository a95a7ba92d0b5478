// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Program data storage.
//!
//! Nothing here assembles mnemonics into opcodes; the memory representation
//! exists for one reason only, the identification of array boundaries that
//! assembly syntax leaves implicit (a name on the first element, then N
//! unnamed elements following it). All successive data initializations go
//! into a single chunk of bytes, and a new chunk starts on every non-data
//! instruction.

use crate::core::report::{ErrorList, Severity};
use crate::core::struc::Struc;

/// Index of a segment in the emission store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentId(pub usize);

/// Index of a structure/union in the emission store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrucId(pub usize);

/// The container a data declaration lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitTarget {
    Segment(SegmentId),
    Struc(StrucId),
}

/// One contiguous chunk of emitted bytes. Every byte remembers which blob
/// it belongs to, so boundaries between distinct emissions stay
/// recoverable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobList {
    blobs: Vec<Vec<u8>>,
    spans: Vec<u32>,
}

impl BlobList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one blob, recording its index for each of its bytes.
    pub fn append(&mut self, blob: Vec<u8>) {
        let idx = self.blobs.len() as u32;
        self.spans.extend(std::iter::repeat(idx).take(blob.len()));
        self.blobs.push(blob);
    }

    /// Total bytes in this chunk.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Index of the blob that owns the given byte offset.
    pub fn blob_index_at(&self, off: usize) -> Option<usize> {
        self.spans.get(off).map(|&i| i as usize)
    }

    /// All bytes of the chunk in emission order.
    pub fn emit(&self) -> Vec<u8> {
        let mut ret = Vec::with_capacity(self.spans.len());
        for blob in &self.blobs {
            ret.extend_from_slice(blob);
        }
        ret
    }
}

/// A pointer into the data of a segment or structure. The offset stays
/// unresolved during pass 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPtr {
    pub target: EmitTarget,
    pub chunk: usize,
    pub off: Option<u64>,
    pub width: u32,
}

impl DataPtr {
    pub fn render(&self, store: &EmitStore) -> String {
        let off_chars = store.word_size(self.target) as usize * 2;
        let off_str = match self.off {
            None => "?".repeat(off_chars),
            Some(off) => format!("{off:0off_chars$x}h"),
        };
        format!(
            "({}*) {}:{}:{}",
            self.width,
            store.target_name(self.target),
            self.chunk,
            off_str
        )
    }
}

/// An open or closed segment and the data chunks emitted into it.
#[derive(Debug, Clone)]
pub struct Segment {
    pub name: String,
    pub chunks: Vec<BlobList>,
    pub prev: Option<SegmentId>,
    pub overflowed: bool,
    pub wordsize: u8,
    chunk_open: bool,
}

impl Segment {
    pub fn new(name: String, wordsize: u8, prev: Option<SegmentId>) -> Self {
        Self {
            name,
            chunks: Vec::new(),
            prev,
            overflowed: false,
            wordsize,
            chunk_open: false,
        }
    }

    pub fn width(&self) -> u64 {
        self.chunks.iter().map(|c| c.len() as u64).sum()
    }

    /// End of the segment's data block as `(chunk, offset)`.
    pub fn offset(&self) -> (usize, u64) {
        match self.chunks.last() {
            Some(chunk) => (self.chunks.len() - 1, chunk.len() as u64),
            None => (0, 0),
        }
    }

    /// Appends a blob to the open chunk, reporting the first overflow of
    /// the segment's address space.
    pub fn add_data(&mut self, blob: Vec<u8>) -> ErrorList {
        let mut err = ErrorList::new();
        let max_size = (1u128 << (self.wordsize as u32 * 8)) - 1;
        if (blob.len() as u128 + self.width() as u128) > max_size && !self.overflowed {
            self.overflowed = true;
            err.push(
                Severity::Error,
                format!(
                    "declaration overflows {}-bit segment: {}",
                    self.wordsize as u32 * 8,
                    self.name
                ),
            );
        }
        if !self.chunk_open || self.chunks.is_empty() {
            self.chunks.push(BlobList::new());
            self.chunk_open = true;
        }
        let chunk = self.chunks.len() - 1;
        self.chunks[chunk].append(blob);
        err
    }

    /// Ends the current chunk; the next data declaration starts a new one.
    pub fn break_chunk(&mut self) {
        self.chunk_open = false;
    }

    pub fn render(&self) -> String {
        format!(
            "SEGMENT ({}-bit, {} bytes of data in {} chunks)",
            self.wordsize as u32 * 8,
            self.width(),
            self.chunks.len()
        )
    }
}

/// Owner of all segments and structures; symbols refer into it by index.
#[derive(Debug, Clone, Default)]
pub struct EmitStore {
    segs: Vec<Segment>,
    strucs: Vec<Struc>,
}

impl EmitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_segment(&mut self, seg: Segment) -> SegmentId {
        self.segs.push(seg);
        SegmentId(self.segs.len() - 1)
    }

    pub fn add_struc(&mut self, struc: Struc) -> StrucId {
        self.strucs.push(struc);
        StrucId(self.strucs.len() - 1)
    }

    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segs[id.0]
    }

    pub fn segment_mut(&mut self, id: SegmentId) -> &mut Segment {
        &mut self.segs[id.0]
    }

    pub fn struc(&self, id: StrucId) -> &Struc {
        &self.strucs[id.0]
    }

    pub fn struc_mut(&mut self, id: StrucId) -> &mut Struc {
        &mut self.strucs[id.0]
    }

    pub fn target_name(&self, target: EmitTarget) -> String {
        match target {
            EmitTarget::Segment(id) => self.segment(id).name.clone(),
            EmitTarget::Struc(id) => self.struc(id).display_name().to_string(),
        }
    }

    /// Maximum number of bytes allowed for addresses within the target.
    pub fn word_size(&self, target: EmitTarget) -> u8 {
        match target {
            EmitTarget::Segment(id) => self.segment(id).wordsize,
            EmitTarget::Struc(id) => self.struc(id).word_size(),
        }
    }

    /// The `(chunk, offset)` at the end of the target's data block. Union
    /// offsets are always zero when seen from outside.
    pub fn offset(&self, target: EmitTarget) -> (usize, u64) {
        match target {
            EmitTarget::Segment(id) => self.segment(id).offset(),
            EmitTarget::Struc(id) => self.struc(id).offset(),
        }
    }

    /// Appends a blob to the target. For structures the bytes propagate to
    /// every enclosing structure, with the union rules applied per level.
    pub fn add_data(&mut self, target: EmitTarget, blob: Vec<u8>) -> ErrorList {
        match target {
            EmitTarget::Segment(id) => self.segment_mut(id).add_data(blob),
            EmitTarget::Struc(id) => self.struc_add_data(id, blob),
        }
    }

    fn struc_add_data(&mut self, id: StrucId, blob: Vec<u8>) -> ErrorList {
        let mut err = ErrorList::new();
        let mut blob = blob;
        let mut cur = Some(id);
        while let Some(StrucId(i)) = cur {
            let s = &mut self.strucs[i];
            if s.union && s.width() > 0 {
                if blob.iter().any(|&b| b != 0) {
                    err.push(
                        Severity::Warning,
                        "ignoring default value for union member beyond the first",
                    );
                }
                if s.width() >= blob.len() as u64 {
                    return err;
                }
                let padlen = blob.len() - s.width() as usize;
                blob = vec![0; padlen];
            }
            s.data.append(blob.clone());
            cur = s.prev;
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_boundaries_are_recoverable() {
        let mut list = BlobList::new();
        list.append(vec![1, 2]);
        list.append(vec![3]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.blob_index_at(0), Some(0));
        assert_eq!(list.blob_index_at(1), Some(0));
        assert_eq!(list.blob_index_at(2), Some(1));
        assert_eq!(list.blob_index_at(3), None);
        assert_eq!(list.emit(), vec![1, 2, 3]);
    }

    #[test]
    fn chunk_break_starts_a_new_chunk() {
        let mut seg = Segment::new("DATA".to_string(), 2, None);
        seg.add_data(vec![1, 2]);
        seg.break_chunk();
        seg.add_data(vec![3]);
        assert_eq!(seg.chunks.len(), 2);
        assert_eq!(seg.offset(), (1, 1));
    }

    #[test]
    fn segment_overflow_fires_exactly_once() {
        let mut seg = Segment::new("TINY".to_string(), 1, None);
        let err = seg.add_data(vec![0; 255]);
        assert!(err.is_empty());
        let err = seg.add_data(vec![0; 2]);
        assert_eq!(err.severity(), Severity::Error);
        let err = seg.add_data(vec![0; 300]);
        assert!(err.is_empty(), "overflow must stay sticky");
    }

    #[test]
    fn unresolved_pointer_renders_question_marks() {
        let mut store = EmitStore::new();
        let id = store.add_segment(Segment::new("D".to_string(), 2, None));
        let ptr = DataPtr {
            target: EmitTarget::Segment(id),
            chunk: 0,
            off: None,
            width: 1,
        };
        assert_eq!(ptr.render(&store), "(1*) D:0:????");
        let resolved = DataPtr {
            off: Some(0x1f),
            ..ptr
        };
        assert_eq!(resolved.render(&store), "(1*) D:0:001fh");
    }
}
