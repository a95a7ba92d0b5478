// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Data definition and symbol assignment directives.

use crate::core::data::{DataPtr, EmitTarget};
use crate::core::item::Item;
use crate::core::lex_stream::{matches, QUOTES};
use crate::core::report::{ErrorList, Severity};
use crate::core::value::{AsmValue, MAX_STRING_BYTES};

use super::{Dialect, Parser};

/// Declared width of a data-define directive, in bytes.
pub(crate) fn data_width(name: &str) -> Option<u32> {
    Some(match name {
        "DB" => 1,
        "DW" => 2,
        "DD" => 4,
        "DF" | "DP" => 6,
        "DQ" => 8,
        "DT" => 10,
        _ => return None,
    })
}

impl Parser {
    /// `sym = expr`: assign the evaluated integer, redefinable.
    pub(crate) fn handle_equals(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let (ret, err) = self.eval_int(&it.params[0]);
        if err.severity() >= Severity::Error {
            return err;
        }
        let Some(value) = ret else {
            return err;
        };
        let mut err = err;
        err.merge(self.set_sym(&it.sym, AsmValue::Int(value), false));
        err
    }

    /// `sym EQU text`: store the unevaluated expression as a constant.
    pub(crate) fn handle_equ(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let param = &it.params[0];
        let (text, mut err) = if param.starts_with('<') || param.starts_with('%') {
            self.text(param)
        } else {
            (param.clone(), ErrorList::new())
        };
        if err.severity() >= Severity::Error {
            return err;
        }
        err.merge(self.set_sym(&it.sym, AsmValue::Expr(text), true));
        err
    }

    /// DB/DW/DD/DF/DP/DQ/DT: append one blob to the current emission
    /// target and install a data pointer for the symbol, if any.
    pub(crate) fn handle_data(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let width = data_width(&it.val).unwrap_or(1);
        let mut err = self.emit_pointer(&it.sym, width);

        let mut blob: Vec<u8> = Vec::new();
        for param in &it.params {
            let bytes = param.as_bytes();
            if bytes.len() >= 2
                && matches(QUOTES, bytes[0])
                && bytes[bytes.len() - 1] == bytes[0]
            {
                // String initializers contribute their raw bytes.
                blob.extend_from_slice(&bytes[1..bytes.len() - 1]);
                continue;
            }
            if param == "?" {
                blob.extend(std::iter::repeat(0).take(width as usize));
                continue;
            }
            let (ret, eval_err) = self.eval_int(param);
            err.merge(eval_err);
            let value = ret.map(|v| v.n).unwrap_or(0);
            blob.extend_from_slice(&value.to_le_bytes()[..(width as usize).min(8)]);
            if width as usize > MAX_STRING_BYTES {
                blob.extend(std::iter::repeat(0).take(width as usize - MAX_STRING_BYTES));
            }
        }
        if let Some(target) = self.emission_target() {
            err.merge(self.store.add_data(target, blob));
        }
        err
    }

    /// `sym LABEL width`: a data pointer without emitted bytes.
    pub(crate) fn handle_label(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let (size, mut err) = self.eval_int(&it.params[0]);
        if err.severity() >= Severity::Error {
            return err;
        }
        if let Some(size) = size {
            err.merge(self.emit_pointer(&it.sym, size.n as u32));
        }
        err
    }

    /// TYPEDEF declares the name; the alias semantics stay with the
    /// consuming back-end.
    pub(crate) fn handle_typedef(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        self.set_sym(&it.sym, AsmValue::TypeAlias(it.params[0].clone()), false)
    }

    /// The innermost structure, or failing that the current segment.
    /// Structures can open inside segments, but not vice versa.
    pub(crate) fn emission_target(&self) -> Option<EmitTarget> {
        if let Some(id) = self.struc {
            return Some(EmitTarget::Struc(id));
        }
        self.seg.map(EmitTarget::Segment)
    }

    /// Installs a data pointer for `sym` at the end of the current
    /// emission target. Pass 1 leaves the offset unresolved.
    pub(crate) fn emit_pointer(&mut self, sym: &str, width: u32) -> ErrorList {
        if sym.is_empty() {
            return ErrorList::new();
        }
        let Some(target) = self.emission_target() else {
            return ErrorList::new();
        };
        let (chunk, off) = self.store.offset(target);
        let ptr = DataPtr {
            target,
            chunk,
            off: self.pass2.then_some(off),
            width,
        };
        match target {
            EmitTarget::Struc(id) => {
                let mut err = ErrorList::new();
                if self.store.struc(id).prev.is_none() && self.dialect == Dialect::Tasm {
                    err.merge(self.syms.set(sym, AsmValue::DataPtr(ptr), true));
                }
                err.merge(
                    self.store
                        .struc_mut(id)
                        .members
                        .set(sym, AsmValue::DataPtr(ptr), true),
                );
                err
            }
            EmitTarget::Segment(_) => self.syms.set(sym, AsmValue::DataPtr(ptr), true),
        }
    }
}
