// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Lexer state machine turning source text into a stream of items, with
//! INCLUDE files spliced inline through a stack of nested lexes.

use std::path::PathBuf;

use crate::core::item::{Item, ItemPos};
use crate::core::keyword::{self, LexHook};
use crate::core::lex_stream::{LexStream, EOF, INS_DELIM, LINEBREAK, WHITESPACE, WORD_DELIM};
use crate::core::report::{ErrorList, Severity};

const MAX_INCLUDE_DEPTH: usize = 40;

/// The instruction currently being assembled from first-token and
/// parameter states.
#[derive(Debug, Default)]
struct Pending {
    sym: String,
    val: String,
    params: Vec<String>,
    line: u32,
}

pub struct Lexer {
    items: Vec<Item>,
    errors: ErrorList,
    fatal: bool,
    depth: usize,
}

impl Lexer {
    /// Lexes `filename`, found through `paths` left to right, and every
    /// file it includes. Items arrive in strict source order with included
    /// files fully inlined.
    pub fn run(filename: &str, paths: &[PathBuf]) -> (Vec<Item>, ErrorList) {
        let mut lexer = Lexer {
            items: Vec::new(),
            errors: ErrorList::new(),
            fatal: false,
            depth: 0,
        };
        lexer.lex_path(filename, paths.to_vec(), &ItemPos::new());
        (lexer.items, lexer.errors)
    }

    /// Lexes an in-memory buffer. Includes resolve relative to the current
    /// directory.
    pub fn lex_str(name: &str, text: &str) -> (Vec<Item>, ErrorList) {
        let mut lexer = Lexer {
            items: Vec::new(),
            errors: ErrorList::new(),
            fatal: false,
            depth: 0,
        };
        lexer.lex_source(name, text.as_bytes(), vec![PathBuf::from(".")], &ItemPos::new());
        (lexer.items, lexer.errors)
    }

    fn lex_path(&mut self, filename: &str, paths: Vec<PathBuf>, outer: &ItemPos) {
        if self.depth >= MAX_INCLUDE_DEPTH {
            self.errors.push_at(
                outer,
                Severity::Fatal,
                format!("include nesting deeper than {MAX_INCLUDE_DEPTH}: {filename}"),
            );
            self.fatal = true;
            return;
        }
        match read_first_from_paths(filename, &paths) {
            Ok((bytes, fullname)) => {
                let mut paths = paths;
                // Relative includes resolve from their own directory too.
                if let Some(dir) = fullname.parent() {
                    paths.push(dir.to_path_buf());
                }
                self.depth += 1;
                self.lex_source(filename, &bytes, paths, outer);
                self.depth -= 1;
            }
            Err(err) => {
                let mut err = err;
                err.set_default_pos(outer);
                self.errors.merge(err);
                self.fatal = true;
            }
        }
    }

    fn lex_source(&mut self, name: &str, input: &[u8], paths: Vec<PathBuf>, outer: &ItemPos) {
        let mut stream = LexStream::new(input);
        let mut cur = Pending::default();
        let mut done = false;
        while !done && !self.fatal {
            if stream.peek() == EOF {
                break;
            }
            let line = stream.line();
            let first = stream.next_until(INS_DELIM).to_vec();

            if stream.peek() == b':' {
                // A label; emit any cached instruction first.
                stream.next();
                self.flush(&mut cur, name, outer, &paths);
                if !first.is_empty() {
                    let pos = outer.extended(&ItemPos::start(name, line));
                    self.items.push(Item::label(pos, lossy(&first)));
                }
                continue;
            }
            if stream.peek() == b'=' {
                // `=` needs no surrounding spaces, which the word scan
                // cannot deliver by itself.
                stream.next();
                self.start_instruction(&mut cur, name, outer, &paths, line, lossy(&first), "=");
            } else {
                let second = stream.peek_until(WORD_DELIM).to_vec();
                if !keyword::is_instruction_keyword(&first) && keyword::is_declarator(&second) {
                    let val = lossy(stream.next_until(WORD_DELIM));
                    self.start_instruction(&mut cur, name, outer, &paths, line, lossy(&first), val);
                } else if first.eq_ignore_ascii_case(b"COMMENT") {
                    stream.ignore(WHITESPACE);
                    let delim = stream.next();
                    stream.next_until(&[delim]);
                    // Yes, everything else on the line is ignored.
                    stream.next_until(LINEBREAK);
                    continue;
                } else {
                    self.start_instruction(&mut cur, name, outer, &paths, line, String::new(), lossy(&first));
                }
            }

            // Parameter state: harvest until comment, linebreak, or EOF.
            loop {
                let param = stream.next_param();
                if !param.is_empty() {
                    cur.params.push(lossy(&param));
                }
                match stream.next() {
                    b';' | b'\\' => {
                        stream.next_until(LINEBREAK);
                        break;
                    }
                    b'\r' | b'\n' => break,
                    EOF => {
                        done = true;
                        break;
                    }
                    _ => {}
                }
            }
        }
        self.flush(&mut cur, name, outer, &paths);
    }

    fn start_instruction(
        &mut self,
        cur: &mut Pending,
        name: &str,
        outer: &ItemPos,
        paths: &[PathBuf],
        line: u32,
        sym: impl Into<String>,
        val: impl Into<String>,
    ) {
        self.flush(cur, name, outer, paths);
        cur.sym = sym.into();
        cur.val = val.into();
        cur.line = line;
    }

    /// Emits the cached instruction, or hands it to its lex hook.
    fn flush(&mut self, cur: &mut Pending, name: &str, outer: &ItemPos, paths: &[PathBuf]) {
        let pending = std::mem::take(cur);
        if pending.val.is_empty() && pending.sym.is_empty() {
            return;
        }
        let pos = outer.extended(&ItemPos::start(name, pending.line));
        let mut item = Item::instruction(pos, pending.sym, pending.val);
        item.params = pending.params;

        let upper = item.val.to_ascii_uppercase();
        if let Some(k) = keyword::lookup(&upper) {
            if k.lex == Some(LexHook::Include) {
                let (ok, err) = keyword::check_param_range(&item, &k.params);
                let mut err = err;
                err.set_default_pos(&item.pos);
                self.errors.merge(err);
                if ok {
                    self.lex_path(&item.params[0].clone(), paths.to_vec(), &item.pos);
                    return;
                }
            }
        }
        if !item.val.is_empty() {
            self.items.push(item);
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Reads the contents of `filename` from the first directory in `paths`
/// that contains such a file. Missing everywhere is fatal.
fn read_first_from_paths(filename: &str, paths: &[PathBuf]) -> Result<(Vec<u8>, PathBuf), ErrorList> {
    for path in paths {
        let fullname = path.join(filename);
        match std::fs::read(&fullname) {
            Ok(bytes) => return Ok((bytes, fullname)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => {
                return Err(ErrorList::of(
                    Severity::Fatal,
                    format!("{}: {err}", fullname.display()),
                ));
            }
        }
    }
    let searched: Vec<String> = paths
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    Err(ErrorList::of(
        Severity::Fatal,
        format!(
            "could not find {} in any of the source paths:\n\t{}",
            filename,
            searched.join("\n\t")
        ),
    ))
}

/// Include resolution for the driver: the same path walk, used to check
/// the top-level file before lexing starts.
pub fn resolve_in_paths(filename: &str, paths: &[PathBuf]) -> Option<PathBuf> {
    paths
        .iter()
        .map(|p| p.join(filename))
        .find(|full| full.is_file())
}
