// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Assembler state directives: .MODEL, OPTION, and the CPU/FPU family.

use crate::core::cpu;
use crate::core::item::Item;
use crate::core::report::{ErrorList, Severity};
use crate::core::value::{AsmInt, AsmValue};

use super::{split_colon, Dialect, Parser};

fn model_values(model: &str) -> Option<(i64, i64, i64)> {
    Some(match model {
        "TINY" => (1, 0, 0),
        "SMALL" => (2, 0, 0),
        "COMPACT" => (3, 0, 1),
        "MEDIUM" => (4, 1, 0),
        "LARGE" => (5, 1, 1),
        "HUGE" => (6, 1, 2),
        "TCHUGE" => (7, 1, 2),
        "TPASCAL" => (0, 0, 1),
        // Yes, the TASM manual actually got @Model wrong here. Under MASM
        // the FLAT value is changed to 7.
        "FLAT" => (1, 0, 0),
        _ => return None,
    })
}

fn interface_value(language: &str) -> Option<i64> {
    Some(match language {
        "NOLANGUAGE" => 0,
        "C" => 1,
        "SYSCALL" => 2,
        "STDCALL" => 3,
        "PASCAL" => 4,
        "FORTRAN" => 5,
        "BASIC" => 6,
        "FASTCALL" | "PROLOG" => 7,
        "CPP" => 8,
        _ => return None,
    })
}

impl Parser {
    pub(crate) fn handle_model(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        let mut err = ErrorList::new();
        let model = it.params[0].to_ascii_uppercase();
        match model_values(&model) {
            Some((mut m, codesize, datasize)) => {
                if model == "FLAT" {
                    if self.cpu_value() & cpu::CPU_386 == 0 {
                        err.push(Severity::Error, "FLAT model requires at least a .386 CPU");
                        return err;
                    }
                    if self.dialect == Dialect::Masm {
                        m = 7;
                    }
                }
                err.merge(self.set_int_sym("@MODEL", AsmInt::new(m)));
                err.merge(self.set_int_sym("@CODESIZE", AsmInt::new(codesize)));
                err.merge(self.set_int_sym("@DATASIZE", AsmInt::new(datasize)));
            }
            None => err.push(Severity::Error, format!("invalid memory model: {model}")),
        }
        match it.params.get(1) {
            Some(language) => {
                let language = language.to_ascii_uppercase();
                match interface_value(&language) {
                    Some(value) => {
                        err.merge(self.set_int_sym("@INTERFACE", AsmInt::new(value)));
                    }
                    None => err.push(Severity::Error, format!("invalid language: {language}")),
                }
            }
            None => err.merge(self.set_int_sym("@INTERFACE", AsmInt::new(0))),
        }
        err
    }

    pub(crate) fn handle_option(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        for param in &it.params {
            let (key, value) = split_colon(param);
            let key = key.to_ascii_uppercase();
            let value = value.to_ascii_uppercase();
            if key == "CASEMAP" {
                match value.as_str() {
                    "NONE" => self.syms.set_case_sensitive(true),
                    "NOTPUBLIC" | "ALL" => self.syms.set_case_sensitive(false),
                    _ => {
                        return ErrorList::of(
                            Severity::Error,
                            format!("illegal value for OPTION {key}: {value}"),
                        );
                    }
                }
            }
        }
        ErrorList::new()
    }

    pub(crate) fn handle_cpu(&mut self, _item_num: usize, it: &Item) -> ErrorList {
        self.set_cpu(&it.val[1..])
    }

    pub(crate) fn cpu_value(&self) -> i64 {
        match self.syms.lookup("@CPU") {
            Some(AsmValue::Int(i)) => i.n,
            _ => 0,
        }
    }

    /// Applies a CPU/FPU directive name (without the dot) to `@CPU` and
    /// `@WORDSIZE`.
    pub(crate) fn set_cpu(&mut self, directive: &str) -> ErrorList {
        let Some(flags) = cpu::cpu_flags(directive, self.cpu_value()) else {
            return ErrorList::of(
                Severity::Error,
                format!("unknown CPU directive: {directive}"),
            );
        };
        let mut err = self.set_sym(
            "@CPU",
            AsmValue::Int(AsmInt::with_base(flags, 2)),
            false,
        );
        err.merge(self.set_int_sym("@WORDSIZE", AsmInt::new(cpu::word_size(flags))));
        err
    }
}
