// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The symbol table: name to value, under the active CASEMAP policy.

use std::collections::HashMap;

use crate::core::data::EmitStore;
use crate::core::report::{ErrorList, Severity};
use crate::core::value::AsmValue;

/// A named assembly value. Symbols flagged constant refuse redefinition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub constant: bool,
    pub value: AsmValue,
}

/// Mapping from symbol name to value. Key normalisation follows the
/// case-sensitivity policy and is applied on every insert and lookup.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    map: HashMap<String, Symbol>,
    case_sensitive: bool,
}

impl SymbolTable {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            map: HashMap::new(),
            case_sensitive,
        }
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Changes the policy for subsequent inserts and lookups
    /// (`OPTION CASEMAP`).
    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
    }

    /// The key a name maps to under the active policy.
    pub fn to_sym_case(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_ascii_uppercase()
        }
    }

    /// Value of a symbol that is meant to exist.
    pub fn get(&self, name: &str) -> Result<&AsmValue, ErrorList> {
        let real_name = self.to_sym_case(name);
        match self.map.get(&real_name) {
            Some(sym) => Ok(&sym.value),
            None => Err(ErrorList::of(
                Severity::Error,
                format!("unknown symbol {real_name}"),
            )),
        }
    }

    /// Value of a symbol if present.
    pub fn lookup(&self, name: &str) -> Option<&AsmValue> {
        self.map.get(&self.to_sym_case(name)).map(|s| &s.value)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.map.contains_key(&self.to_sym_case(name))
    }

    /// Defines or redefines a symbol. Fails when the existing definition is
    /// constant.
    pub fn set(&mut self, name: &str, value: AsmValue, constant: bool) -> ErrorList {
        let real_name = self.to_sym_case(name);
        if self.map.get(&real_name).is_some_and(|s| s.constant) {
            return ErrorList::of(
                Severity::Error,
                format!("constant symbol {real_name} already defined elsewhere"),
            );
        }
        self.map.insert(real_name, Symbol { constant, value });
        ErrorList::new()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Sorted `• NAME: value` lines, one per symbol.
    pub fn dump(&self, store: &EmitStore, indent: usize) -> String {
        let mut keys: Vec<&String> = self.map.keys().collect();
        keys.sort();
        let prefix = "\t".repeat(indent);
        let mut out = String::new();
        for key in keys {
            let sym = &self.map[key];
            let constness = if sym.constant { "(const) " } else { "" };
            out.push_str(&format!(
                "{prefix}\u{2022} {key}: {constness}{}\n",
                sym.value.render(store, indent)
            ));
        }
        out
    }

    /// Sorted machine-readable form of the table.
    pub fn to_json(&self, store: &EmitStore) -> serde_json::Value {
        let mut keys: Vec<&String> = self.map.keys().collect();
        keys.sort();
        let mut obj = serde_json::Map::new();
        for key in keys {
            let sym = &self.map[key];
            obj.insert(
                key.clone(),
                serde_json::json!({
                    "constant": sym.constant,
                    "kind": sym.value.thing(),
                    "value": sym.value.render(store, 0),
                }),
            );
        }
        serde_json::Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::AsmInt;

    fn int(n: i64) -> AsmValue {
        AsmValue::Int(AsmInt::new(n))
    }

    #[test]
    fn case_folding_policy() {
        let mut folded = SymbolTable::new(false);
        folded.set("foo", int(1), false);
        assert!(folded.is_defined("FOO"));
        assert!(folded.is_defined("Foo"));

        let mut sensitive = SymbolTable::new(true);
        sensitive.set("foo", int(1), false);
        assert!(sensitive.is_defined("foo"));
        assert!(!sensitive.is_defined("FOO"));
    }

    #[test]
    fn constant_redefinition_fails() {
        let mut syms = SymbolTable::new(false);
        assert!(syms.set("K", int(1), true).is_empty());
        let err = syms.set("K", int(2), false);
        assert_eq!(err.severity(), Severity::Error);
        assert!(err.entries()[0].message.contains("already defined"));
        // The old value survives.
        assert_eq!(syms.get("K").unwrap(), &int(1));
    }

    #[test]
    fn plain_redefinition_succeeds() {
        let mut syms = SymbolTable::new(false);
        syms.set("X", int(1), false);
        assert!(syms.set("X", int(2), false).is_empty());
        assert_eq!(syms.get("X").unwrap(), &int(2));
    }

    #[test]
    fn unknown_symbol_reports_normalised_name() {
        let syms = SymbolTable::new(false);
        let err = syms.get("missing").unwrap_err();
        assert!(err.entries()[0].message.contains("unknown symbol MISSING"));
    }

    #[test]
    fn dump_is_sorted() {
        let mut syms = SymbolTable::new(false);
        syms.set("b", int(2), false);
        syms.set("a", int(1), true);
        let store = EmitStore::new();
        let dump = syms.dump(&store, 0);
        assert_eq!(dump, "\u{2022} A: (const) 1\n\u{2022} B: 2\n");
    }
}
