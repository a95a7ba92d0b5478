// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The directive table: every recognised keyword with its dispatch flags,
//! symbol rule, parameter range, and hooks.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::core::item::Item;
use crate::core::report::{ErrorList, Severity};
use crate::parser::Parser;

/// Dispatch flags of a keyword.
///
/// Conditional directives run even on an inactive branch, macro-affecting
/// directives run even inside an open macro body, and emitting directives
/// require an open emission target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordType(u8);

impl KeywordType {
    pub const NONE: Self = Self(0);
    /// Binds a preceding identifier as the item's symbol at lex time.
    pub const DECLARATOR: Self = Self(1);
    pub const CONDITIONAL: Self = Self(1 << 1);
    pub const MACRO: Self = Self(1 << 2);
    pub const CODE_BLOCK: Self = Self(1 << 3);
    pub const EMIT: Self = Self(1 << 4);
    pub const EMIT_CODE: Self = Self(1 << 5);

    pub fn contains(self, flags: Self) -> bool {
        self.0 & flags.0 == flags.0
    }

    pub fn intersects(self, flags: Self) -> bool {
        self.0 & flags.0 != 0
    }
}

impl std::ops::BitOr for KeywordType {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Whether the keyword needs a symbol name in front of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymRule {
    Optional,
    Required,
}

/// Accepted number of parameters. `max == None` means no upper limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub min: usize,
    pub max: Option<usize>,
}

pub const fn p_req(n: usize) -> Range {
    Range {
        min: n,
        max: Some(n),
    }
}

pub const fn p_min(n: usize) -> Range {
    Range { min: n, max: None }
}

pub const fn p_between(min: usize, max: usize) -> Range {
    Range {
        min,
        max: Some(max),
    }
}

/// Function handling a directive at parsing time.
pub type ParseFn = fn(&mut Parser, usize, &Item) -> ErrorList;

/// Special treatment a keyword receives at lexing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexHook {
    /// Recursively lex the named file and splice its items inline.
    Include,
}

pub struct Keyword {
    pub typ: KeywordType,
    pub sym: SymRule,
    pub params: Range,
    pub parse: Option<ParseFn>,
    pub lex: Option<LexHook>,
}

impl Keyword {
    const fn new(typ: KeywordType, sym: SymRule, params: Range, parse: Option<ParseFn>) -> Self {
        Self {
            typ,
            sym,
            params,
            parse,
            lex: None,
        }
    }
}

/// Directives that can never be preceded by an identifier name; the lexer
/// refuses to bind a symbol ahead of them even when the following word is
/// a declarator.
const INSTRUCTION_KEYWORDS: [&str; 3] = ["CALL", "INVOKE", "OPTION"];

pub fn is_instruction_keyword(word: &[u8]) -> bool {
    INSTRUCTION_KEYWORDS
        .iter()
        .any(|k| word.eq_ignore_ascii_case(k.as_bytes()))
}

/// Looks up a keyword by its upper-cased name.
pub fn lookup(name_upper: &str) -> Option<&'static Keyword> {
    static KEYWORDS: OnceLock<HashMap<String, Keyword>> = OnceLock::new();
    KEYWORDS.get_or_init(build_table).get(name_upper)
}

/// Whether a raw word names a declarator keyword (for lex-time symbol
/// binding).
pub fn is_declarator(word: &[u8]) -> bool {
    let upper = String::from_utf8_lossy(word).to_ascii_uppercase();
    lookup(&upper).is_some_and(|k| k.typ.contains(KeywordType::DECLARATOR))
}

fn build_table() -> HashMap<String, Keyword> {
    use KeywordType as T;
    use SymRule::{Optional, Required};

    let mut t: HashMap<String, Keyword> = HashMap::new();
    let mut add = |name: &str, k: Keyword| {
        t.insert(name.to_string(), k);
    };

    for name in ["DB", "DW", "DD", "DF", "DP", "DQ", "DT"] {
        add(
            name,
            Keyword::new(
                T::DECLARATOR | T::EMIT,
                Optional,
                p_min(1),
                Some(Parser::handle_data),
            ),
        );
    }
    add(
        "=",
        Keyword::new(T::DECLARATOR, Required, p_req(1), Some(Parser::handle_equals)),
    );
    add(
        "EQU",
        Keyword::new(T::DECLARATOR, Required, p_req(1), Some(Parser::handle_equ)),
    );
    add(
        "TEXTEQU",
        Keyword::new(T::DECLARATOR, Required, p_min(1), None),
    );
    add(
        "LABEL",
        Keyword::new(
            T::DECLARATOR | T::EMIT,
            Required,
            p_req(1),
            Some(Parser::handle_label),
        ),
    );
    add(
        "TYPEDEF",
        Keyword::new(T::DECLARATOR, Required, p_req(1), Some(Parser::handle_typedef)),
    );
    for name in ["CATSTR", "SUBSTR", "INSTR", "SIZESTR"] {
        add(name, Keyword::new(T::DECLARATOR, Required, p_min(1), None));
    }

    add(
        "MACRO",
        Keyword::new(
            T::DECLARATOR | T::MACRO,
            Required,
            p_min(0),
            Some(Parser::handle_macro),
        ),
    );
    add(
        "ENDM",
        Keyword::new(T::MACRO, Optional, p_req(0), Some(Parser::handle_endm)),
    );
    add(
        "LOCAL",
        Keyword::new(T::NONE, Optional, p_min(1), Some(Parser::handle_local)),
    );
    add(
        "IRP",
        Keyword::new(T::MACRO, Optional, p_req(2), Some(Parser::handle_dummy_macro)),
    );
    add(
        "IRPC",
        Keyword::new(T::MACRO, Optional, p_req(2), Some(Parser::handle_dummy_macro)),
    );
    add(
        "REPT",
        Keyword::new(T::MACRO, Optional, p_req(1), Some(Parser::handle_dummy_macro)),
    );

    add(
        "PROC",
        Keyword::new(
            T::DECLARATOR | T::CODE_BLOCK,
            Required,
            p_min(0),
            Some(Parser::handle_proc),
        ),
    );
    add(
        "ENDP",
        Keyword::new(
            T::DECLARATOR | T::CODE_BLOCK,
            Optional,
            p_req(0),
            Some(Parser::handle_endp),
        ),
    );

    for name in ["STRUC", "STRUCT", "UNION"] {
        add(
            name,
            Keyword::new(
                T::DECLARATOR,
                Optional,
                p_between(0, 1),
                Some(Parser::handle_struc),
            ),
        );
    }
    add(
        "ENDS",
        Keyword::new(T::DECLARATOR, Optional, p_req(0), Some(Parser::handle_ends)),
    );
    add(
        "SEGMENT",
        Keyword::new(T::DECLARATOR, Required, p_min(0), Some(Parser::handle_segment)),
    );
    add("GROUP", Keyword::new(T::DECLARATOR, Required, p_min(1), None));

    add(
        ".MODEL",
        Keyword::new(T::NONE, Optional, p_between(1, 2), Some(Parser::handle_model)),
    );
    add(
        "OPTION",
        Keyword::new(T::NONE, Optional, p_min(1), Some(Parser::handle_option)),
    );
    for base in ["8086", "186", "286", "386", "486", "586", "686", "X64"] {
        for suffix in ["", "P", "C", "N"] {
            add(
                &format!(".{base}{suffix}"),
                Keyword::new(T::NONE, Optional, p_req(0), Some(Parser::handle_cpu)),
            );
        }
    }
    for fpu in ["8087", "287", "387"] {
        add(
            &format!(".{fpu}"),
            Keyword::new(T::NONE, Optional, p_req(0), Some(Parser::handle_cpu)),
        );
    }

    for name in ["IF", "IFE"] {
        add(
            name,
            Keyword::new(T::CONDITIONAL, Optional, p_req(1), Some(Parser::handle_if)),
        );
    }
    for name in ["IFDEF", "IFNDEF"] {
        add(
            name,
            Keyword::new(T::CONDITIONAL, Optional, p_req(1), Some(Parser::handle_ifdef)),
        );
    }
    for name in ["IFB", "IFNB"] {
        add(
            name,
            Keyword::new(T::CONDITIONAL, Optional, p_req(1), Some(Parser::handle_ifb)),
        );
    }
    for name in ["IFIDN", "IFIDNI", "IFDIF", "IFDIFI"] {
        add(
            name,
            Keyword::new(T::CONDITIONAL, Optional, p_req(2), Some(Parser::handle_ifidn)),
        );
    }
    for name in ["ELSEIF", "ELSEIFE"] {
        add(
            name,
            Keyword::new(T::CONDITIONAL, Optional, p_req(1), Some(Parser::handle_elseif)),
        );
    }
    for name in ["ELSEIFDEF", "ELSEIFNDEF"] {
        add(
            name,
            Keyword::new(
                T::CONDITIONAL,
                Optional,
                p_req(1),
                Some(Parser::handle_elseifdef),
            ),
        );
    }
    for name in ["ELSEIFB", "ELSEIFNB"] {
        add(
            name,
            Keyword::new(
                T::CONDITIONAL,
                Optional,
                p_req(1),
                Some(Parser::handle_elseifb),
            ),
        );
    }
    for name in ["ELSEIFIDN", "ELSEIFIDNI", "ELSEIFDIF", "ELSEIFDIFI"] {
        add(
            name,
            Keyword::new(
                T::CONDITIONAL,
                Optional,
                p_req(2),
                Some(Parser::handle_elseifidn),
            ),
        );
    }
    add(
        "ELSE",
        Keyword::new(T::CONDITIONAL, Optional, p_req(0), Some(Parser::handle_else)),
    );
    add(
        "ENDIF",
        Keyword::new(T::CONDITIONAL, Optional, p_req(0), Some(Parser::handle_endif)),
    );

    add(
        "INCLUDE",
        Keyword {
            typ: T::NONE,
            sym: Optional,
            params: p_req(1),
            parse: None,
            lex: Some(LexHook::Include),
        },
    );

    t
}

/// Checks the item's parameter count against the keyword's range. A count
/// below the minimum is an error and vetoes the handler; excess parameters
/// only warn.
pub fn check_param_range(it: &Item, r: &Range) -> (bool, ErrorList) {
    let given = it.params.len();
    let upper = it.val.to_ascii_uppercase();
    if given < r.min {
        let mut text = format!(
            "{} requires at least {} parameters, {} given",
            upper, r.min, given
        );
        if given > 0 {
            text.push_str(": ");
            text.push_str(&it.params_string());
        }
        return (false, ErrorList::of(Severity::Error, text));
    }
    if let Some(max) = r.max {
        if given > max {
            let head = if max == 0 {
                format!("{upper} accepts no parameters")
            } else {
                format!("{upper} accepts a maximum of {max} parameters")
            };
            let extra = given - max;
            let msg = format!(
                "{head}, ignoring {extra} additional ones: {}",
                it.params[given - extra..].join(", ")
            );
            return (true, ErrorList::of(Severity::Warning, msg));
        }
    }
    (true, ErrorList::new())
}

/// Symbol-rule and arity check ahead of dispatch. Returns whether the
/// handler should still run.
pub fn check_syntax(it: &Item, k: &Keyword) -> (bool, ErrorList) {
    if k.sym == SymRule::Required && it.sym.is_empty() {
        return (
            false,
            ErrorList::of(Severity::Error, format!("{} needs a name", it.val)),
        );
    }
    check_param_range(it, &k.params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::{Item, ItemPos};

    fn item(val: &str, params: &[&str]) -> Item {
        let mut it = Item::instruction(ItemPos::start("t.asm", 1), "", val);
        it.params = params.iter().map(|p| p.to_string()).collect();
        it
    }

    #[test]
    fn table_knows_the_core_directives() {
        for name in [
            "DB", "DT", "=", "EQU", "LABEL", "MACRO", "ENDM", "PROC", "ENDP", "STRUC", "UNION",
            "ENDS", "SEGMENT", ".MODEL", "OPTION", ".8086", ".386P", ".X64", ".287", "IF",
            "IFNDEF", "ELSEIFDIFI", "ENDIF", "INCLUDE", "REPT", "TEXTEQU", "GROUP",
        ] {
            assert!(lookup(name).is_some(), "missing keyword {name}");
        }
        assert!(lookup("MOV").is_none());
    }

    #[test]
    fn declarators_bind_preceding_symbols() {
        assert!(is_declarator(b"db"));
        assert!(is_declarator(b"Equ"));
        assert!(is_declarator(b"SEGMENT"));
        assert!(!is_declarator(b"ENDIF"));
        assert!(!is_declarator(b"INCLUDE"));
    }

    #[test]
    fn instruction_keywords_never_take_symbols() {
        assert!(is_instruction_keyword(b"call"));
        assert!(is_instruction_keyword(b"OPTION"));
        assert!(!is_instruction_keyword(b"PROC"));
    }

    #[test]
    fn too_few_parameters_veto_the_handler() {
        let it = item("equ", &[]);
        let (ok, err) = check_param_range(&it, &p_req(1));
        assert!(!ok);
        assert_eq!(err.severity(), Severity::Error);
        assert!(err.entries()[0]
            .message
            .contains("EQU requires at least 1 parameters, 0 given"));
    }

    #[test]
    fn excess_parameters_only_warn() {
        let it = item("endif", &["junk", "more"]);
        let (ok, err) = check_param_range(&it, &p_req(0));
        assert!(ok);
        assert_eq!(err.severity(), Severity::Warning);
        assert!(err.entries()[0]
            .message
            .contains("ENDIF accepts no parameters, ignoring 2 additional ones: junk, more"));
    }

    #[test]
    fn missing_symbol_is_reported_by_name() {
        let it = item("SEGMENT", &[]);
        let k = lookup("SEGMENT").unwrap();
        let (ok, err) = check_syntax(&it, k);
        assert!(!ok);
        assert!(err.entries()[0].message.contains("SEGMENT needs a name"));
    }
}
