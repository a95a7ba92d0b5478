// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for asm2c.

use std::io;

use clap::Parser as _;

use asm2c::cli::{validate_cli, Cli, OutputFormat};
use asm2c::core::report::Severity;
use asm2c::lexer::Lexer;
use asm2c::listing;
use asm2c::parser::Parser;

fn main() {
    let cli = Cli::parse();
    if let Err(err) = validate_cli(&cli) {
        eprintln!("{err}");
        std::process::exit(1);
    }

    let (items, lex_errors) = Lexer::run(&cli.filename, &cli.includes);
    lex_errors.print_to(&mut io::stderr());
    if lex_errors.severity() >= Severity::Fatal {
        std::process::exit(1);
    }

    let mut pass1 = Parser::new(cli.syntax);
    for item in &items {
        pass1.eval(item.clone());
    }
    pass1.end();
    pass1.errors.print_to(&mut io::stderr());
    if pass1.errors.severity() >= Severity::Fatal {
        std::process::exit(1);
    }

    // Pass 2 replays the normalised stream with offset resolution enabled.
    // Its diagnostics repeat pass 1's and are dropped.
    let mut pass2 = Parser::new(cli.syntax);
    pass2.pass2 = true;
    for item in pass1.instructions.clone() {
        pass2.eval(item);
    }
    pass2.end();

    match cli.format {
        OutputFormat::Text => {
            let mut out = io::stdout();
            let _ = listing::write_listing(&mut out, &pass2.instructions);
            eprint!("{}", listing::dump_symbols(&pass2.syms, &pass2.store));
        }
        OutputFormat::Json => {
            let report = listing::report_json(&pass2.instructions, &pass2.syms, &pass2.store);
            match serde_json::to_string_pretty(&report) {
                Ok(text) => println!("{text}"),
                Err(err) => eprintln!("failed to serialise report: {err}"),
            }
        }
    }

    let worst = lex_errors.severity().max(pass1.errors.severity());
    if worst >= Severity::Error {
        std::process::exit(1);
    }
}
