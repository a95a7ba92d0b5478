// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Block-scope directives: procedures, segments, structures and unions.

use crate::core::data::Segment;
use crate::core::item::Item;
use crate::core::lex_stream::{LexStream, EOF};
use crate::core::report::{ErrorList, Severity};
use crate::core::struc::Struc;
use crate::core::value::AsmValue;

use super::Parser;

impl Parser {
    pub(crate) fn handle_proc(&mut self, item_num: usize, it: &Item) -> ErrorList {
        let mut err = ErrorList::new();
        if self.proc.nest == 0 {
            self.proc.name = it.sym.clone();
            self.proc.start = item_num;
        } else {
            err.push(
                Severity::Warning,
                format!("ignoring nested procedure {}", it.sym),
            );
        }
        self.proc.nest += 1;
        err
    }

    pub(crate) fn handle_endp(&mut self, item_num: usize, it: &Item) -> ErrorList {
        if self.proc.nest == 0 {
            return ErrorList::of(
                Severity::Warning,
                format!("ignoring procedure {} without a PROC directive", it.sym),
            );
        }
        let mut err = ErrorList::new();
        if self.proc.nest == 1 {
            err.push(
                Severity::Debug,
                format!(
                    "found procedure {} ranging from lex items #{}-#{}",
                    self.proc.name, self.proc.start, item_num
                ),
            );
        }
        self.proc.nest -= 1;
        err
    }

    pub(crate) fn handle_segment(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let cpu_wordsize = self.wordsize() as u8;
        let sym = self.to_sym_case(&it.sym);
        let mut err = ErrorList::new();

        let reopened = match self.syms.lookup(&sym) {
            Some(AsmValue::Segment(id)) => Some(*id),
            Some(_) => {
                return ErrorList::of(
                    Severity::Error,
                    format!("cannot redeclare {sym} as a segment, ignoring"),
                );
            }
            None => None,
        };
        let mut wordsize = match reopened {
            Some(id) => self.store.segment(id).wordsize,
            None => cpu_wordsize,
        };

        if let Some(param) = it.params.first() {
            let mut stream = LexStream::new(param.as_bytes());
            while stream.peek() != EOF {
                let (attr, attr_err) = stream.next_segment_param();
                err.merge(attr_err);
                if attr.is_empty() {
                    break;
                }
                match attr.to_ascii_uppercase().as_slice() {
                    b"USE16" => wordsize = 2,
                    b"USE32" => wordsize = 4,
                    b"USE64" => wordsize = 8,
                    _ => {}
                }
            }
        }
        if wordsize > cpu_wordsize {
            match wordsize {
                4 => err.push(
                    Severity::Error,
                    "32-bit segments require at least a .386 CPU setting",
                ),
                8 => err.push(
                    Severity::Error,
                    "64-bit segments require at least a .X64 CPU setting",
                ),
                _ => {}
            }
            return err;
        }

        let id = match reopened {
            Some(id) => {
                let seg = self.store.segment_mut(id);
                seg.wordsize = wordsize;
                seg.prev = self.seg;
                id
            }
            None => self
                .store
                .add_segment(Segment::new(sym.clone(), wordsize, self.seg)),
        };
        self.seg = Some(id);
        self.seg_nest += 1;
        err.merge(self.set_sym(&sym, AsmValue::Segment(id), false));
        err
    }

    /// ENDS is context-sensitive: it closes the current structure if one
    /// is open under a matching name, else the current segment.
    pub(crate) fn handle_ends(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let sym = self.to_sym_case(&it.sym);
        if let Some(seg_id) = self.seg {
            if self.store.segment(seg_id).name == sym {
                let mut err = ErrorList::new();
                if let Some(struc_id) = self.struc {
                    err.push(Severity::Error, self.open_struc_chain(struc_id));
                    self.struc = None;
                }
                self.seg = self.store.segment(seg_id).prev;
                self.seg_nest -= 1;
                return err;
            }
        }
        if let Some(struc_id) = self.struc {
            // The outermost structure closes under its own name; nested
            // ones close anonymously.
            let s = self.store.struc(struc_id);
            let outermost = s.prev.is_none();
            let expected = if outermost {
                self.to_sym_case(&s.name)
            } else {
                String::new()
            };
            if sym == expected {
                let prev = s.prev;
                let name = s.name.clone();
                let mut err = ErrorList::new();
                if outermost && !name.is_empty() {
                    err.merge(self.set_sym(&name, AsmValue::Struc(struc_id), false));
                }
                self.struc = prev;
                return err;
            }
        }
        ErrorList::of(Severity::Error, format!("unmatched ENDS: {sym}"))
    }

    /// Top-level structures take their name before the directive; nested
    /// ones can optionally carry one after it.
    pub(crate) fn handle_struc(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let mut sym = it.sym.clone();
        if self.struc.is_some() {
            if !it.sym.is_empty() {
                return ErrorList::of(
                    Severity::Error,
                    format!(
                        "name of nested structure must come after {}: {}",
                        it.val, it.sym
                    ),
                );
            }
            if let Some(first) = it.params.first() {
                sym = first.clone();
            }
        } else if it.sym.is_empty() {
            return ErrorList::of(Severity::Error, format!("{} needs a name", it.val));
        }
        let union = it.val == "UNION";
        let id = self.store.add_struc(Struc::new(
            sym,
            union,
            self.syms.case_sensitive(),
            self.struc,
        ));
        self.struc = Some(id);
        ErrorList::new()
    }
}
