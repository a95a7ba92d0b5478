// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The polymorphic assembly value: everything a symbol can stand for.

use std::fmt;

use crate::core::data::{DataPtr, EmitStore, SegmentId, StrucId};
use crate::core::item::Item;
use crate::core::report::{ErrorList, Severity};

/// Longest string that still converts to an integer.
pub const MAX_STRING_BYTES: usize = 8;

/// An integer constant carrying its output base and an optional pointer
/// width (nonzero values turn the integer into a pointer of that length).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsmInt {
    pub n: i64,
    pub ptr: u64,
    pub base: u32,
}

impl AsmInt {
    pub fn new(n: i64) -> Self {
        Self { n, ptr: 0, base: 10 }
    }

    pub fn with_base(n: i64, base: u32) -> Self {
        Self { n, ptr: 0, base }
    }

    /// Width in bytes: the smallest of {1, 2, 4, 8} that holds `|n|`.
    pub fn width(&self) -> u32 {
        let n = self.n.unsigned_abs();
        if n <= 0xFF {
            1
        } else if n <= 0xFFFF {
            2
        } else if n <= 0xFFFF_FFFF {
            4
        } else {
            8
        }
    }

    /// Whether `input` is to be read as a single integer constant.
    pub fn is_literal(input: &[u8]) -> bool {
        let Some(&first) = input.first() else {
            return false;
        };
        if (first == b'+' || first == b'-') && input.len() == 1 {
            return false;
        }
        first.is_ascii_digit() && !input.iter().any(|&b| b == b' ' || b == b'\t')
    }

    /// Parses an integer constant with its radix suffix (`b`, `o`, `t`, `h`).
    pub fn from_literal(input: &[u8]) -> Result<AsmInt, ErrorList> {
        let original = String::from_utf8_lossy(input).into_owned();
        let mut digits = input;
        let base = match input.last() {
            Some(b'b') => 2,
            Some(b'o') => 8,
            Some(b't') => 10,
            Some(b'h') => 16,
            _ => 0,
        };
        let base = if base != 0 {
            digits = &digits[..digits.len() - 1];
            base
        } else {
            10
        };
        let text = std::str::from_utf8(digits)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ErrorList::of(
                    Severity::Error,
                    format!("invalid integer constant: {original}"),
                )
            })?;
        match i64::from_str_radix(text, base) {
            Ok(n) => Ok(AsmInt { n, ptr: 0, base }),
            Err(_) => Err(ErrorList::of(
                Severity::Error,
                format!("invalid integer constant: {original}"),
            )),
        }
    }

    /// The value as big-endian ASCII bytes with leading NULs removed.
    pub fn format_ascii(&self) -> Vec<u8> {
        let bytes = (self.n as u64).to_be_bytes();
        let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        bytes[first..].to_vec()
    }
}

fn fmt_radix(n: i64, radix: u32) -> String {
    let abs = n.unsigned_abs();
    let digits = match radix {
        2 => format!("{abs:b}"),
        8 => format!("{abs:o}"),
        16 => format!("{abs:x}"),
        _ => format!("{abs}"),
    };
    if n < 0 {
        format!("-{digits}")
    } else {
        digits
    }
}

impl fmt::Display for AsmInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = if self.base == 0 { 10 } else { self.base };
        let mut ret = match base {
            2 => fmt_radix(self.n, 2) + "b",
            8 => fmt_radix(self.n, 8) + "o",
            16 => {
                let mut s = fmt_radix(self.n, 16);
                let start = usize::from(s.starts_with('-') || s.starts_with('+'));
                if s.as_bytes()[start].is_ascii_alphabetic() {
                    s.insert(start, '0');
                }
                s + "h"
            }
            256 => quote_ascii(&self.format_ascii()),
            _ => fmt_radix(self.n, 10),
        };
        if self.ptr != 0 {
            ret = format!("({}*) {}", self.ptr, ret);
        }
        f.write_str(&ret)
    }
}

/// Converts a string literal to a big-endian packed integer of base 256.
pub fn string_to_int(bytes: &[u8]) -> Result<AsmInt, ErrorList> {
    if bytes.len() > MAX_STRING_BYTES {
        return Err(ErrorList::of(
            Severity::Error,
            format!(
                "string constant larger than {} bytes: {}",
                MAX_STRING_BYTES,
                String::from_utf8_lossy(bytes)
            ),
        ));
    }
    let mut n: u64 = 0;
    for (i, &b) in bytes.iter().rev().enumerate() {
        n |= (b as u64) << (i * 8);
    }
    Ok(AsmInt {
        n: n as i64,
        ptr: 0,
        base: 256,
    })
}

/// Quotes a string with whichever of `"` and `'` it does not contain.
/// Assembly literals have no escaping, so at most one of the two works.
pub fn quote_ascii(bytes: &[u8]) -> String {
    let payload = String::from_utf8_lossy(bytes);
    if !bytes.contains(&b'"') {
        format!("\"{payload}\"")
    } else {
        format!("'{payload}'")
    }
}

/// Kind of a multiline macro argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroArgKind {
    /// May be left out at the call site.
    Plain,
    /// Must be supplied (`:REQ`).
    Required,
    /// Falls back to a default text (`:=<text>`).
    Default,
    /// Absorbs all remaining parameters (`:REST`).
    Rest,
    /// Absorbs all remaining parameters (`:VARARG`).
    VarArg,
}

impl MacroArgKind {
    pub fn takes_rest(self) -> bool {
        matches!(self, MacroArgKind::Rest | MacroArgKind::VarArg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroArg {
    pub name: String,
    pub kind: MacroArgKind,
    pub default: String,
}

impl fmt::Display for MacroArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        match self.kind {
            MacroArgKind::Plain => Ok(()),
            MacroArgKind::Required => f.write_str(":REQ"),
            MacroArgKind::Default => write!(f, ":=<{}>", self.default),
            MacroArgKind::Rest => f.write_str(":REST"),
            MacroArgKind::VarArg => f.write_str(":VARARG"),
        }
    }
}

/// A captured multiline macro: argument list, body items, lexical locals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    pub args: Vec<MacroArg>,
    pub code: Vec<Item>,
    pub locals: Vec<String>,
}

impl fmt::Display for MacroDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MACRO")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            } else {
                f.write_str("\t")?;
            }
            write!(f, "{arg}")?;
        }
        if !self.locals.is_empty() {
            write!(f, "\n\tLOCAL\t{}", self.locals.join(", "))?;
        }
        f.write_str("\n")?;
        for ins in &self.code {
            writeln!(f, "{ins}")?;
        }
        f.write_str("\tENDM")
    }
}

/// Everything a symbol can refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmValue {
    Int(AsmInt),
    Str(Vec<u8>),
    Expr(String),
    Macro(MacroDef),
    DataPtr(DataPtr),
    Segment(SegmentId),
    Struc(StrucId),
    TypeAlias(String),
}

impl AsmValue {
    /// A singular noun describing this kind of value.
    pub fn thing(&self) -> &'static str {
        match self {
            AsmValue::Int(_) => "integer constant",
            AsmValue::Str(_) => "string",
            AsmValue::Expr(_) => "arithmetic expression",
            AsmValue::Macro(_) => "multiline macro",
            AsmValue::DataPtr(_) => "data pointer",
            AsmValue::Segment(_) => "segment name",
            AsmValue::Struc(_) => "structure",
            AsmValue::TypeAlias(_) => "type alias",
        }
    }

    /// Width in bytes of the value.
    pub fn width(&self, store: &EmitStore) -> u64 {
        match self {
            AsmValue::Int(i) => i.width() as u64,
            AsmValue::Str(s) => s.len() as u64,
            AsmValue::Expr(e) => e.len() as u64,
            AsmValue::Macro(_) => 0,
            AsmValue::DataPtr(p) => p.width as u64,
            AsmValue::Segment(id) => store.segment(*id).width(),
            AsmValue::Struc(id) => store.struc(*id).width(),
            AsmValue::TypeAlias(_) => 0,
        }
    }

    /// Human-readable form for the symbol dump. `indent` nests structure
    /// member tables.
    pub fn render(&self, store: &EmitStore, indent: usize) -> String {
        match self {
            AsmValue::Int(i) => i.to_string(),
            AsmValue::Str(s) => quote_ascii(s),
            AsmValue::Expr(e) => format!("({e})"),
            AsmValue::Macro(m) => m.to_string(),
            AsmValue::DataPtr(p) => p.render(store),
            AsmValue::Segment(id) => store.segment(*id).render(),
            AsmValue::Struc(id) => store.struc(*id).render(store, indent),
            AsmValue::TypeAlias(t) => t.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn literal_bases() {
        assert_eq!(AsmInt::from_literal(b"42").unwrap().n, 42);
        assert_eq!(AsmInt::from_literal(b"101b").unwrap().n, 5);
        assert_eq!(AsmInt::from_literal(b"17o").unwrap().n, 0o17);
        assert_eq!(AsmInt::from_literal(b"99t").unwrap().n, 99);
        let hex = AsmInt::from_literal(b"0FFh").unwrap();
        assert_eq!(hex.n, 255);
        assert_eq!(hex.base, 16);
    }

    #[test]
    fn literal_rejects_garbage() {
        assert!(AsmInt::from_literal(b"12x4").is_err());
        assert!(AsmInt::from_literal(b"h").is_err());
    }

    #[test]
    fn literal_detection() {
        assert!(AsmInt::is_literal(b"0"));
        assert!(AsmInt::is_literal(b"0deadh"));
        assert!(!AsmInt::is_literal(b"deadh"));
        assert!(!AsmInt::is_literal(b"-"));
        assert!(!AsmInt::is_literal(b"1 2"));
        assert!(!AsmInt::is_literal(b""));
    }

    #[test]
    fn width_thresholds_are_inclusive() {
        assert_eq!(AsmInt::new(0).width(), 1);
        assert_eq!(AsmInt::new(255).width(), 1);
        assert_eq!(AsmInt::new(256).width(), 2);
        assert_eq!(AsmInt::new(-255).width(), 1);
        assert_eq!(AsmInt::new(65536).width(), 4);
        assert_eq!(AsmInt::new(0x1_0000_0000).width(), 8);
    }

    #[test]
    fn display_base_suffixes() {
        assert_eq!(AsmInt::with_base(5, 2).to_string(), "101b");
        assert_eq!(AsmInt::with_base(8, 8).to_string(), "10o");
        assert_eq!(AsmInt::with_base(255, 16).to_string(), "0ffh");
        assert_eq!(AsmInt::with_base(0x1F, 16).to_string(), "1fh");
        assert_eq!(AsmInt::with_base(-255, 16).to_string(), "-0ffh");
        assert_eq!(AsmInt::new(11).to_string(), "11");
    }

    #[test]
    fn pointer_width_prefix() {
        let mut v = AsmInt::new(16);
        v.ptr = 2;
        assert_eq!(v.to_string(), "(2*) 16");
    }

    #[test]
    fn string_packing_is_big_endian() {
        let v = string_to_int(b"AB").unwrap();
        assert_eq!(v.n, 0x4142);
        assert_eq!(v.base, 256);
        assert!(string_to_int(b"toolonger").is_err());
    }

    #[test]
    fn base_256_display_round_trips() {
        let v = string_to_int(b"AB").unwrap();
        assert_eq!(v.to_string(), "\"AB\"");
        let quoted = string_to_int(b"a\"b").unwrap();
        assert_eq!(quoted.to_string(), "'a\"b'");
    }

    proptest! {
        #[test]
        fn string_int_round_trip(s in "[ -~]{1,8}") {
            // Quote characters force the alternate quote; strip them so the
            // formatted payload can be compared byte for byte.
            let bytes: Vec<u8> = s.bytes().filter(|&b| b != b'"' && b != b'\'').collect();
            prop_assume!(!bytes.is_empty() && bytes[0] != 0 && bytes[0] != b' ');
            let v = string_to_int(&bytes).unwrap();
            prop_assert_eq!(v.format_ascii(), bytes);
        }

        #[test]
        fn decimal_literal_round_trip(n in 0i64..=i64::MAX) {
            let text = n.to_string();
            let v = AsmInt::from_literal(text.as_bytes()).unwrap();
            prop_assert_eq!(v.n, n);
            prop_assert_eq!(v.to_string(), text);
        }
    }

    #[test]
    fn macro_arg_display() {
        let arg = MacroArg {
            name: "B".to_string(),
            kind: MacroArgKind::Default,
            default: "7".to_string(),
        };
        assert_eq!(arg.to_string(), "B:=<7>");
    }
}
