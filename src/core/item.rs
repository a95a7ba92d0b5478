// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Lexed items and the source position chains attached to them.

use std::fmt;

/// A single `(filename, line)` step of a position chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pos {
    pub file: String,
    pub line: u32,
}

/// Where an item came from, traced through include files and macro
/// expansions. Entries are ordered oldest-first; the last entry is the
/// line the item text actually stands on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPos {
    chain: Vec<Pos>,
}

impl ItemPos {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-entry chain.
    pub fn start(file: impl Into<String>, line: u32) -> Self {
        Self {
            chain: vec![Pos {
                file: file.into(),
                line,
            }],
        }
    }

    /// This chain extended by all entries of `inner`. Used when an include
    /// or macro expansion nests one source context inside another.
    pub fn extended(&self, inner: &ItemPos) -> ItemPos {
        let mut chain = Vec::with_capacity(self.chain.len() + inner.chain.len());
        chain.extend(self.chain.iter().cloned());
        chain.extend(inner.chain.iter().cloned());
        ItemPos { chain }
    }

    pub fn push(&mut self, file: impl Into<String>, line: u32) {
        self.chain.push(Pos {
            file: file.into(),
            line,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn entries(&self) -> &[Pos] {
        &self.chain
    }
}

impl fmt::Display for ItemPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pos) in self.chain.iter().enumerate() {
            if i > 0 {
                f.write_str(" \u{2192} ")?;
            }
            if pos.line == 0 {
                f.write_str(&pos.file)?;
            } else {
                write!(f, "{}({})", pos.file, pos.line)?;
            }
        }
        Ok(())
    }
}

/// Kind of a lexed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A jump target (`name:`).
    Label,
    /// An instruction or directive with its parameters.
    Instruction,
}

/// One parsed logical line: an optional symbol, the instruction or label
/// name, and the parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub pos: ItemPos,
    pub kind: ItemKind,
    pub sym: String,
    pub val: String,
    pub params: Vec<String>,
}

impl Item {
    pub fn label(pos: ItemPos, sym: impl Into<String>) -> Self {
        Self {
            pos,
            kind: ItemKind::Label,
            sym: sym.into(),
            val: String::new(),
            params: Vec::new(),
        }
    }

    pub fn instruction(pos: ItemPos, sym: impl Into<String>, val: impl Into<String>) -> Self {
        Self {
            pos,
            kind: ItemKind::Instruction,
            sym: sym.into(),
            val: val.into(),
            params: Vec::new(),
        }
    }

    /// Parameters joined the way they are echoed in diagnostics.
    pub fn params_string(&self) -> String {
        self.params.join(", ")
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ItemKind::Label => write!(f, "{}:", self.sym)?,
            ItemKind::Instruction => {
                if !self.sym.is_empty() {
                    f.write_str(&self.sym)?;
                }
                write!(f, "\t{}", self.val)?;
            }
        }
        if !self.params.is_empty() {
            write!(f, "\t{}", self.params_string())?;
        }
        Ok(())
    }
}
