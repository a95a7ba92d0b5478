// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// End-to-end runs of the asm2c binary.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_asm2c"))
}

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("asm2c-cli-{tag}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn listing_and_symbol_dump() {
    let dir = temp_dir("listing");
    let file = dir.join("prog.asm");
    fs::write(&file, "X = 5 + 3 * 2\nDATA SEGMENT\nS DB 'AB'\nDATA ENDS\n").unwrap();

    let out = bin().arg(&file).output().unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("X\t=\t5 + 3 * 2"));
    assert!(stdout.contains("S\tDB\t'AB'"));

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Symbols: ["));
    assert!(stderr.contains("\u{2022} X: 11"));
    // The pointer offset is resolved by the second pass.
    assert!(stderr.contains("\u{2022} S: (const) (1*) DATA:0:0000h"));

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn json_report() {
    let dir = temp_dir("json");
    let file = dir.join("prog.asm");
    fs::write(&file, "K EQU <40h>\n").unwrap();

    let out = bin().arg("--format").arg("json").arg(&file).output().unwrap();
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["symbols"]["K"]["kind"], "arithmetic expression");
    assert_eq!(report["symbols"]["K"]["constant"], true);
    assert_eq!(report["symbols"]["K"]["value"], "(40h)");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn errors_set_the_exit_status() {
    let dir = temp_dir("errors");
    let file = dir.join("bad.asm");
    fs::write(&file, "K EQU <1>\nK = 2\n").unwrap();

    let out = bin().arg(&file).output().unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("**Error**"));
    assert!(stderr.contains("constant symbol K already defined elsewhere"));
    assert!(stderr.contains("bad.asm(2)"), "position chain: {stderr}");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn warnings_alone_keep_success() {
    let dir = temp_dir("warn");
    let file = dir.join("warn.asm");
    fs::write(&file, "X ENDP\n").unwrap();

    let out = bin().arg(&file).output().unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("*Warning*"));

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn missing_input_fails_cleanly() {
    let out = bin().arg("no-such-file.asm").output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("input file not found"));
}

#[test]
fn missing_include_is_fatal() {
    let dir = temp_dir("fatal");
    let file = dir.join("prog.asm");
    fs::write(&file, "include gone.inc\n").unwrap();

    let out = bin().arg(&file).output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("**Fatal**"));

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn include_paths_are_searched_in_order() {
    let dir = temp_dir("paths");
    let lib = dir.join("lib");
    fs::create_dir_all(&lib).unwrap();
    fs::write(lib.join("defs.inc"), "FROM_LIB = 1\n").unwrap();
    fs::write(dir.join("prog.asm"), "include defs.inc\n").unwrap();

    let out = bin()
        .arg("-I")
        .arg(&dir)
        .arg("-I")
        .arg(&lib)
        .arg(dir.join("prog.asm"))
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stderr).contains("FROM_LIB"));

    let _ = fs::remove_dir_all(dir);
}
