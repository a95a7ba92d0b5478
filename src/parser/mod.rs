// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The parser: consumes lexed items in order, tracks every nesting context,
//! and populates the symbol table and emission store.

mod conditionals;
mod directives_data;
mod directives_scope;
mod macros;
mod metadata;

use crate::core::item::{Item, ItemKind, ItemPos};
use crate::core::keyword::{self, KeywordType};
use crate::core::report::{ErrorList, Severity};
use crate::core::shunt;
use crate::core::symbol_table::SymbolTable;
use crate::core::value::{AsmInt, AsmValue};
use crate::core::data::{EmitStore, SegmentId, StrucId};

pub(crate) use directives_data::data_width;

/// Target assembler dialect.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    #[value(name = "TASM")]
    Tasm,
    #[value(name = "MASM")]
    Masm,
}

/// State of one nestable named block kind (procedures, macros).
#[derive(Debug, Clone, Default)]
pub struct NestInfo {
    /// Name of level 1.
    pub name: String,
    /// First item in the instruction list that belongs to level 1.
    pub start: usize,
    /// Current nesting level.
    pub nest: i32,
}

pub struct Parser {
    pub dialect: Dialect,
    /// Pass 2 resolves data pointer offsets left open during pass 1.
    pub pass2: bool,
    /// The normalised instruction stream kept for listing and replay.
    pub instructions: Vec<Item>,
    pub syms: SymbolTable,
    pub store: EmitStore,
    /// Diagnostics in source order.
    pub errors: ErrorList,

    pub(crate) macro_local_count: u32,
    pub(crate) proc: NestInfo,
    pub(crate) macro_block: NestInfo,
    pub(crate) struc: Option<StrucId>,
    pub(crate) seg: Option<SegmentId>,
    pub(crate) seg_nest: i32,
    pub(crate) if_nest: i32,
    pub(crate) if_match: i32,
    pub(crate) if_else: bool,
}

impl Parser {
    pub fn new(dialect: Dialect) -> Self {
        let mut p = Self {
            dialect,
            pass2: false,
            instructions: Vec::new(),
            syms: SymbolTable::new(false),
            store: EmitStore::new(),
            errors: ErrorList::new(),
            macro_local_count: 0,
            proc: NestInfo::default(),
            macro_block: NestInfo::default(),
            struc: None,
            seg: None,
            seg_nest: 0,
            if_nest: 0,
            if_match: 0,
            if_else: false,
        };
        let err = p.set_cpu("8086");
        p.errors.merge(err);
        p
    }

    /// Evaluates one item, updates the parse state accordingly, and keeps
    /// the item in the instruction list unless it lies on an inactive
    /// conditional branch or was consumed by its directive.
    pub fn eval(&mut self, mut it: Item) {
        let upper = it.val.to_ascii_uppercase();
        let k = keyword::lookup(&upper);
        let typ = k.map(|k| k.typ).unwrap_or_default();
        if k.is_some() {
            it.val = upper;
        }
        if !(typ.contains(KeywordType::CONDITIONAL) || self.if_match >= self.if_nest) {
            return;
        }
        let mut keep = true;
        if typ.contains(KeywordType::MACRO) || self.macro_block.nest == 0 {
            let mut err = ErrorList::new();
            if let Some(k) = k {
                if typ.contains(KeywordType::EMIT) && self.seg.is_none() && self.struc.is_none() {
                    err.push(
                        Severity::Error,
                        format!("code or data emission requires a segment: {it}"),
                    );
                } else if self.struc.is_some()
                    && typ.intersects(KeywordType::CODE_BLOCK | KeywordType::EMIT_CODE)
                {
                    err.push(
                        Severity::Error,
                        format!("{} not allowed inside structure definition", it.val),
                    );
                } else {
                    let (ok, syntax_err) = keyword::check_syntax(&it, k);
                    err.merge(syntax_err);
                    if ok {
                        if let Some(parse) = k.parse {
                            let item_num = self.instructions.len();
                            err.merge(parse(self, item_num, &it));
                            keep = !typ.contains(KeywordType::CONDITIONAL);
                        }
                    }
                }
            } else if let Some(AsmValue::Macro(def)) = self.syms.lookup(&it.val).cloned() {
                let (kept, expand_err) = self.expand_macro(&def, &it);
                keep = kept;
                err.merge(expand_err);
            }
            self.break_chunk_after(&it);
            self.record(&it.pos, err);
        }
        if keep {
            self.instructions.push(it);
        }
    }

    // A new data chunk starts after any non-data instruction.
    fn break_chunk_after(&mut self, it: &Item) {
        if it.kind != ItemKind::Instruction || data_width(&it.val).is_some() {
            return;
        }
        if let Some(id) = self.seg {
            self.store.segment_mut(id).break_chunk();
        }
    }

    /// End-of-stream bookkeeping: every still-open block is reported.
    pub fn end(&mut self) {
        let pos = ItemPos::start("(EOF)", 0);
        let mut err = ErrorList::new();
        if let Some(id) = self.struc {
            err.push(Severity::Error, self.open_struc_chain(id));
        }
        if self.seg_nest != 0 {
            if let Some(id) = self.seg {
                err.push(Severity::Error, self.open_seg_chain(id));
            }
        }
        if self.proc.nest != 0 {
            err.push(
                Severity::Warning,
                format!(
                    "ignoring procedure {} without an ENDP directive",
                    self.proc.name
                ),
            );
        }
        if self.if_nest != 0 {
            err.push(
                Severity::Error,
                format!("{} open conditional blocks at end of input", self.if_nest),
            );
        }
        if self.macro_block.nest != 0 {
            err.push(
                Severity::Error,
                format!("open macro block: {}", self.macro_block.name),
            );
        }
        self.record(&pos, err);
    }

    pub(crate) fn open_struc_chain(&self, id: StrucId) -> String {
        let mut names = Vec::new();
        let mut cur = Some(id);
        while let Some(i) = cur {
            let s = self.store.struc(i);
            names.push(s.display_name().to_string());
            cur = s.prev;
        }
        Self::open_chain("open structure", "open structures", &names)
    }

    pub(crate) fn open_seg_chain(&self, id: SegmentId) -> String {
        let mut names = Vec::new();
        let mut cur = Some(id);
        while let Some(i) = cur {
            let s = self.store.segment(i);
            names.push(s.name.clone());
            cur = s.prev;
        }
        Self::open_chain("open segment", "open segments", &names)
    }

    fn open_chain(thing: &str, things: &str, names: &[String]) -> String {
        let head = if names.len() > 1 { things } else { thing };
        format!("{head}: {}", names.join(" \u{2190} "))
    }

    /// Attaches the item position to diagnostics raised without one and
    /// files them in source order.
    pub(crate) fn record(&mut self, pos: &ItemPos, mut err: ErrorList) {
        if err.is_empty() {
            return;
        }
        err.set_default_pos(pos);
        self.errors.merge(err);
    }

    pub(crate) fn to_sym_case(&self, name: &str) -> String {
        self.syms.to_sym_case(name)
    }

    pub(crate) fn set_sym(&mut self, name: &str, value: AsmValue, constant: bool) -> ErrorList {
        self.syms.set(name, value, constant)
    }

    pub(crate) fn set_int_sym(&mut self, name: &str, value: AsmInt) -> ErrorList {
        self.syms.set(name, AsmValue::Int(value), false)
    }

    /// Current address width in bytes as driven by the CPU directives.
    pub(crate) fn wordsize(&self) -> u32 {
        match self.syms.lookup("@WORDSIZE") {
            Some(AsmValue::Int(i)) => i.n as u32,
            _ => 2,
        }
    }

    pub(crate) fn eval_int(&self, expr: &str) -> (Option<AsmInt>, ErrorList) {
        shunt::eval_int(&self.syms, expr, self.wordsize())
    }

    pub(crate) fn eval_bool(&self, expr: &str) -> (bool, ErrorList) {
        shunt::eval_bool(&self.syms, expr, self.wordsize())
    }
}

/// Splits `KEY:VALUE` text, trimming both halves.
pub(crate) fn split_colon(s: &str) -> (&str, &str) {
    match s.split_once(':') {
        Some((key, val)) => (key.trim(), val.trim()),
        None => (s.trim(), ""),
    }
}
