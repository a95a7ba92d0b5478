// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Output writers: the normalised instruction listing and the symbol dump.

use std::io::{self, Write};

use crate::core::data::EmitStore;
use crate::core::item::Item;
use crate::core::symbol_table::SymbolTable;

/// Writes the parsed instruction stream, one normalised item per line.
pub fn write_listing<W: Write>(w: &mut W, items: &[Item]) -> io::Result<()> {
    for item in items {
        writeln!(w, "{item}")?;
    }
    Ok(())
}

/// The sorted symbol dump for the diagnostic channel.
pub fn dump_symbols(syms: &SymbolTable, store: &EmitStore) -> String {
    if syms.is_empty() {
        return String::new();
    }
    format!("Symbols: [\n{}]\n", syms.dump(store, 0))
}

/// Machine-readable run report.
pub fn report_json(items: &[Item], syms: &SymbolTable, store: &EmitStore) -> serde_json::Value {
    serde_json::json!({
        "items": items.iter().map(|it| it.to_string()).collect::<Vec<_>>(),
        "symbols": syms.to_json(store),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::ItemPos;
    use crate::core::value::{AsmInt, AsmValue};

    #[test]
    fn listing_is_one_item_per_line() {
        let pos = ItemPos::start("t.asm", 1);
        let mut a = Item::instruction(pos.clone(), "X", "=");
        a.params.push("5".into());
        let b = Item::label(pos, "next");
        let mut out = Vec::new();
        write_listing(&mut out, &[a, b]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "X\t=\t5\nnext:\n");
    }

    #[test]
    fn dump_wraps_sorted_symbols() {
        let mut syms = SymbolTable::new(false);
        syms.set("X", AsmValue::Int(AsmInt::new(11)), false);
        let store = EmitStore::new();
        assert_eq!(dump_symbols(&syms, &store), "Symbols: [\n\u{2022} X: 11\n]\n");
        assert_eq!(dump_symbols(&SymbolTable::new(false), &store), "");
    }

    #[test]
    fn json_report_carries_items_and_symbols() {
        let mut syms = SymbolTable::new(false);
        syms.set("K", AsmValue::Int(AsmInt::new(1)), true);
        let store = EmitStore::new();
        let report = report_json(&[], &syms, &store);
        assert_eq!(report["symbols"]["K"]["constant"], true);
        assert_eq!(report["symbols"]["K"]["kind"], "integer constant");
        assert_eq!(report["symbols"]["K"]["value"], "1");
    }
}
