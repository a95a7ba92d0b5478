// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Conditional assembly: the IF/ELSEIF/ELSE/ENDIF families and the text
// expansions their predicates run on.

use crate::core::item::Item;
use crate::core::report::{ErrorList, Severity};
use crate::core::value::AsmValue;

use super::{Dialect, Parser};

impl Parser {
    /// Evaluates `s` as a text string used in a conditional directive:
    /// either a `<...>` literal or a `%name` symbol expansion.
    pub(crate) fn text(&self, s: &str) -> (String, ErrorList) {
        let fail = || {
            (
                String::new(),
                ErrorList::of(
                    Severity::Error,
                    format!("invalid <text string> or %text_macro: {s}"),
                ),
            )
        };
        match s.as_bytes().first() {
            Some(b'<') => {
                let mut err = ErrorList::new();
                let t = &s[1..];
                match t.find('>') {
                    None => fail(),
                    Some(rb) => {
                        if rb != t.len() - 1 {
                            err.push(
                                Severity::Warning,
                                format!("extra characters on line: {}", &t[rb + 1..]),
                            );
                        }
                        // TASM does not strip whitespace here, JWasm does.
                        let inner = if self.dialect == Dialect::Masm {
                            t[..rb].trim().to_string()
                        } else {
                            t[..rb].to_string()
                        };
                        (inner, err)
                    }
                }
            }
            Some(b'%') => {
                let name = self.to_sym_case(s[1..].trim());
                match self.syms.get(&name) {
                    Err(e) => (String::new(), e),
                    Ok(AsmValue::Int(i)) => (i.n.to_string(), ErrorList::new()),
                    Ok(AsmValue::Expr(e)) => (e.clone(), ErrorList::new()),
                    Ok(other) => (
                        String::new(),
                        ErrorList::of(
                            Severity::Error,
                            format!("can't use {} as a text string: {}", other.thing(), name),
                        ),
                    ),
                }
            }
            _ => fail(),
        }
    }

    pub(crate) fn is_blank(&self, s: &str) -> (bool, ErrorList) {
        let (ret, err) = self.text(s);
        (ret.is_empty(), err)
    }

    fn text_pair(&self, s1: &str, s2: &str) -> (String, String, ErrorList) {
        let (ret1, mut err) = self.text(s1);
        let (ret2, err2) = self.text(s2);
        err.merge(err2);
        (ret1, ret2, err)
    }

    /// Opens a conditional level; the branch becomes active when the
    /// enclosing branch is active and the predicate held.
    pub(crate) fn eval_if(&mut self, matched: bool) -> ErrorList {
        let valid = matched && self.if_match == self.if_nest;
        if valid {
            self.if_match += 1;
        }
        self.if_nest += 1;
        self.if_else = !valid;
        ErrorList::new()
    }

    pub(crate) fn eval_elseif(&mut self, directive: &str, matched: bool) -> ErrorList {
        if self.if_nest == 0 {
            return ErrorList::of(Severity::Error, format!("unmatched {directive}"));
        }
        if self.if_match == self.if_nest {
            self.if_match -= 1;
        } else if self.if_match == self.if_nest - 1 && self.if_else && matched {
            self.if_match += 1;
            self.if_else = false;
        }
        ErrorList::new()
    }

    pub(crate) fn handle_if(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let mode = it.val == "IF";
        let (ret, mut err) = self.eval_bool(&it.params[0]);
        err.merge(self.eval_if(ret == mode));
        err
    }

    pub(crate) fn handle_ifdef(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let defined = self.syms.is_defined(&it.params[0]);
        let mode = it.val == "IFDEF";
        self.eval_if(defined == mode)
    }

    pub(crate) fn handle_ifb(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let (blank, mut err) = self.is_blank(&it.params[0]);
        if err.severity() >= Severity::Error {
            return err;
        }
        let mode = it.val == "IFB";
        err.merge(self.eval_if(blank == mode));
        err
    }

    pub(crate) fn handle_ifidn(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let (fold, identical) = ifidn_mode(&it.val);
        let (ret1, ret2, mut err) = self.text_pair(&it.params[0], &it.params[1]);
        if err.severity() >= Severity::Error {
            return err;
        }
        let equal = text_equal(&ret1, &ret2, fold);
        err.merge(self.eval_if(equal == identical));
        err
    }

    pub(crate) fn handle_elseif(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let mode = it.val == "ELSEIF";
        let (ret, mut err) = self.eval_bool(&it.params[0]);
        err.merge(self.eval_elseif(&it.val, ret == mode));
        err
    }

    pub(crate) fn handle_elseifdef(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let defined = self.syms.is_defined(&it.params[0]);
        let mode = it.val == "ELSEIFDEF";
        self.eval_elseif(&it.val, defined == mode)
    }

    pub(crate) fn handle_elseifb(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let (blank, mut err) = self.is_blank(&it.params[0]);
        if err.severity() >= Severity::Error {
            return err;
        }
        let mode = it.val == "ELSEIFB";
        err.merge(self.eval_elseif(&it.val, blank == mode));
        err
    }

    pub(crate) fn handle_elseifidn(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let (fold, identical) = ifidn_mode(&it.val["ELSE".len()..]);
        let (ret1, ret2, mut err) = self.text_pair(&it.params[0], &it.params[1]);
        if err.severity() >= Severity::Error {
            return err;
        }
        let equal = text_equal(&ret1, &ret2, fold);
        err.merge(self.eval_elseif(&it.val, equal == identical));
        err
    }

    pub(crate) fn handle_else(&mut self, _item_num: usize, _it: &Item) -> ErrorList {
        self.eval_elseif("ELSE", true)
    }

    pub(crate) fn handle_endif(&mut self, _item_num: usize, _it: &Item) -> ErrorList {
        if self.if_nest == 0 {
            return ErrorList::of(
                Severity::Error,
                "found ENDIF without a matching condition",
            );
        }
        if self.if_match == self.if_nest {
            self.if_match -= 1;
            self.if_else = false;
        }
        self.if_nest -= 1;
        ErrorList::new()
    }
}

// Folds IFIDN(I) and IFDIF(I) into one comparison description:
// (case-folded, expecting-identical).
fn ifidn_mode(name: &str) -> (bool, bool) {
    match name {
        "IFIDN" => (false, true),
        "IFIDNI" => (true, true),
        "IFDIF" => (false, false),
        _ => (true, false),
    }
}

fn text_equal(a: &str, b: &str, fold: bool) -> bool {
    if fold {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}
