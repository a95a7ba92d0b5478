// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Multiline macros: MACRO/ENDM capture, typed arguments, locals, and the
// textual substitution expansion performs.

use std::collections::HashMap;

use crate::core::item::Item;
use crate::core::lex_stream::{LexStream, EOF, SHUNT_DELIM, WHITESPACE};
use crate::core::report::{ErrorList, Severity};
use crate::core::value::{AsmValue, MacroArg, MacroArgKind, MacroDef};

use super::{split_colon, Parser};

impl Parser {
    pub(crate) fn handle_macro(&mut self, item_num: usize, it: &Item) -> ErrorList {
        if self.macro_block.nest == 0 {
            self.macro_block.name = it.sym.clone();
            self.macro_block.start = item_num;
        }
        self.macro_block.nest += 1;
        ErrorList::new()
    }

    pub(crate) fn handle_endm(&mut self, item_num: usize, _it: &Item) -> ErrorList {
        let mut err = ErrorList::new();
        if self.macro_block.nest == 0 {
            return ErrorList::of(Severity::Warning, "ENDM without an open macro block");
        }
        if self.macro_block.nest == 1 && !self.macro_block.name.is_empty() {
            let name = self.macro_block.name.clone();
            let (def, def_err) = self.new_macro(item_num);
            err.merge(def_err);
            if err.severity() < Severity::Error {
                if let Some(def) = def {
                    err.merge(self.set_sym(&name, AsmValue::Macro(def), false));
                }
            }
            self.macro_block.name = String::new();
        }
        self.macro_block.nest -= 1;
        err
    }

    /// Placeholder for any non-MACRO block terminated with ENDM.
    pub(crate) fn handle_dummy_macro(&mut self, _item_num: usize, _it: &Item) -> ErrorList {
        self.macro_block.nest += 1;
        ErrorList::new()
    }

    pub(crate) fn handle_local(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        // Inside a macro body LOCAL is captured, not dispatched; reaching
        // this handler means the directive sits outside any macro.
        ErrorList::of(
            Severity::Warning,
            format!("ignoring LOCAL outside of a macro body: {}", it.params_string()),
        )
    }

    /// Builds a macro from the captured item range ending at `item_num`.
    fn new_macro(&mut self, item_num: usize) -> (Option<MacroDef>, ErrorList) {
        let mut err = ErrorList::new();
        let header = self.instructions[self.macro_block.start].clone();
        let mut args = Vec::with_capacity(header.params.len());
        for (i, param) in header.params.iter().enumerate() {
            let (name_org, typ_org) = split_colon(param);
            let name = self.to_sym_case(name_org);
            let typ = typ_org.to_ascii_uppercase();
            let arg = if typ == "REST" || typ == "VARARG" {
                // TASM would actually accept this elsewhere, but it does
                // not make sense at all.
                if i != header.params.len() - 1 {
                    return (
                        None,
                        ErrorList::of_at(
                            &header.pos,
                            Severity::Error,
                            format!("{name}:{typ} must be the last parameter"),
                        ),
                    );
                }
                let kind = if typ == "REST" {
                    MacroArgKind::Rest
                } else {
                    MacroArgKind::VarArg
                };
                MacroArg {
                    name,
                    kind,
                    default: String::new(),
                }
            } else if typ.is_empty() {
                MacroArg {
                    name,
                    kind: MacroArgKind::Plain,
                    default: String::new(),
                }
            } else if typ == "REQ" {
                MacroArg {
                    name,
                    kind: MacroArgKind::Required,
                    default: String::new(),
                }
            } else if let Some(stripped) = typ_org.strip_prefix('=') {
                let (default, text_err) = self.text(stripped.trim());
                if text_err.severity() >= Severity::Error {
                    return (None, text_err);
                }
                err.merge(text_err);
                MacroArg {
                    name,
                    kind: MacroArgKind::Default,
                    default,
                }
            } else {
                return (
                    None,
                    ErrorList::of_at(
                        &header.pos,
                        Severity::Error,
                        format!("invalid macro argument type: {typ}"),
                    ),
                );
            };
            args.push(arg);
        }

        let body = &self.instructions[self.macro_block.start + 1..item_num];
        let mut locals = Vec::new();
        let mut code = Vec::new();
        let mut locals_allowed = true;
        for ins in body {
            if ins.val.eq_ignore_ascii_case("LOCAL") {
                if locals_allowed {
                    locals.extend(ins.params.iter().map(|p| self.to_sym_case(p)));
                } else {
                    err.push_at(
                        &ins.pos,
                        Severity::Warning,
                        format!(
                            "LOCAL directives must come first in a macro body, ignoring: {}",
                            ins.params_string()
                        ),
                    );
                }
            } else {
                locals_allowed = false;
                code.push(ins.clone());
            }
        }
        (Some(MacroDef { args, code, locals }), err)
    }

    /// Expands `def` using the parameters of the call-site item and
    /// re-evaluates every body line. Returns whether the call item itself
    /// should stay in the instruction list (only on failed expansion).
    pub(crate) fn expand_macro(&mut self, def: &MacroDef, it: &Item) -> (bool, ErrorList) {
        let mut err = ErrorList::new();
        let mut replace_map: HashMap<String, String> = HashMap::new();

        for (i, arg) in def.args.iter().enumerate() {
            if arg.kind.takes_rest() {
                let rest = if i < it.params.len() {
                    it.params[i..].join(", ")
                } else {
                    String::new()
                };
                replace_map.insert(arg.name.clone(), rest);
                continue;
            }
            replace_map.insert(arg.name.clone(), arg.default.clone());
            let mut got = false;
            if let Some(param) = it.params.get(i).filter(|p| !p.is_empty()) {
                got = true;
                let text = if param.starts_with('<') || param.starts_with('%') {
                    let (text, text_err) = self.text(param);
                    let failed = text_err.severity() >= Severity::Error;
                    err.merge(text_err);
                    if failed {
                        return (true, err);
                    }
                    text
                } else {
                    param.clone()
                };
                replace_map.insert(arg.name.clone(), text);
            }
            if arg.kind == MacroArgKind::Required && !got {
                err.push(
                    Severity::Error,
                    format!("macro argument #{} ({}) is required", i + 1, arg.name),
                );
            }
        }
        if !err.is_empty() {
            return (true, err);
        }

        for local in &def.locals {
            // Some code might actually rely on the resulting labels being
            // named exactly like this.
            replace_map.insert(
                local.clone(),
                format!("??{:04X}", self.macro_local_count),
            );
            self.macro_local_count += 1;
        }

        for ins in &def.code {
            let mut expanded = Item {
                pos: it.pos.extended(&ins.pos),
                kind: ins.kind,
                sym: self.substitute(&ins.sym, &replace_map),
                val: self.substitute(&ins.val, &replace_map),
                params: Vec::with_capacity(ins.params.len()),
            };
            for param in &ins.params {
                expanded.params.push(self.substitute(param, &replace_map));
            }
            self.eval(expanded);
        }
        (false, err)
    }

    /// Walks `s` token by token, replacing bound argument names and
    /// honouring the `&` concatenation operator.
    fn substitute(&self, s: &str, replace_map: &HashMap<String, String>) -> String {
        let mut ret = String::new();
        let mut and_cached = false;
        let input = s.as_bytes();
        let mut stream = LexStream::new(input);
        while stream.peek() != EOF {
            // Any whitespace in s is copied through.
            while stream.peek() != EOF && WHITESPACE.contains(&stream.peek()) {
                ret.push(stream.next() as char);
            }
            if stream.peek() == EOF {
                break;
            }
            let token = stream.next_token(SHUNT_DELIM);
            let mut token = String::from_utf8_lossy(token).into_owned();
            if token == "&" {
                and_cached = true;
                token = String::new();
            } else if let Some(bound) = replace_map.get(&self.to_sym_case(&token)) {
                token = bound.clone();
                if stream.peek() == b'&' {
                    stream.next();
                }
                and_cached = false;
            } else if and_cached {
                ret.push('&');
                and_cached = false;
            }
            ret.push_str(&token);
        }
        ret
    }
}
