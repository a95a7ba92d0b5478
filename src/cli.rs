// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, ValueEnum};

use crate::lexer::resolve_in_paths;
use crate::parser::Dialect;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(
    name = "asm2c",
    version = VERSION,
    about = "TASM/MASM x86 assembly front-end: parses source into a resolved instruction stream and symbol table"
)]
pub struct Cli {
    #[arg(value_name = "FILE", help = "Assembly file")]
    pub filename: String,
    #[arg(
        long = "syntax",
        value_enum,
        default_value_t = Dialect::Tasm,
        long_help = "Target assembler. The dialect drives text literal whitespace \
                     stripping, the FLAT model value, and outer-structure symbol \
                     visibility."
    )]
    pub syntax: Dialect,
    #[arg(
        short = 'I',
        long = "include",
        value_name = "DIR",
        action = ArgAction::Append,
        default_value = ".",
        long_help = "Add the given directory to the list of assembly include \
                     directories. Repeatable; directories are searched left to right."
    )]
    pub includes: Vec<PathBuf>,
    #[arg(
        long = "format",
        value_enum,
        default_value_t = OutputFormat::Text,
        long_help = "Select output format. text prints the listing to stdout and the \
                     symbol dump to stderr; json prints one machine-readable document \
                     to stdout."
    )]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Rejects a missing input file before any lexing starts.
pub fn validate_cli(cli: &Cli) -> Result<(), String> {
    if Path::new(&cli.filename).is_file() {
        return Ok(());
    }
    if resolve_in_paths(&cli.filename, &cli.includes).is_some() {
        return Ok(());
    }
    Err(format!("input file not found: {}", cli.filename))
}
