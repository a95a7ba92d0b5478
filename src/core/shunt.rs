// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Shunting-yard parsing of arithmetic expressions.

use std::fmt;

use crate::core::lex_stream::{matches, LexStream, EOF, QUOTES, SHUNT_DELIM, WHITESPACE};
use crate::core::report::{ErrorList, Severity};
use crate::core::symbol_table::SymbolTable;
use crate::core::value::{string_to_int, AsmInt, AsmValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuntOpId {
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Not,
    ParenL,
    ParenR,
    Ptr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShuntOp {
    pub id: ShuntOpId,
    pub prec: u8,
    pub args: u8,
}

impl fmt::Display for ShuntOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.id {
            ShuntOpId::Plus => "+",
            ShuntOpId::Minus => "-",
            ShuntOpId::Mul => "*",
            ShuntOpId::Div => "/",
            ShuntOpId::Mod => "MOD",
            ShuntOpId::Shl => "SHL",
            ShuntOpId::Shr => "SHR",
            ShuntOpId::And => "AND",
            ShuntOpId::Or => "OR",
            ShuntOpId::Xor => "XOR",
            ShuntOpId::Eq => "EQ",
            ShuntOpId::Ne => "NE",
            ShuntOpId::Lt => "LT",
            ShuntOpId::Le => "LE",
            ShuntOpId::Gt => "GT",
            ShuntOpId::Ge => "GE",
            ShuntOpId::Not => "NOT",
            ShuntOpId::ParenL => "(",
            ShuntOpId::ParenR => ")",
            ShuntOpId::Ptr => "PTR",
        };
        f.write_str(name)
    }
}

const fn op(id: ShuntOpId, prec: u8, args: u8) -> ShuntOp {
    ShuntOp { id, prec, args }
}

/// Which operator set the next token is matched against. Alternates so that
/// `+` and `-` are read as sign or sum depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpSet {
    Unary,
    Binary,
}

fn unary_op(token: &str) -> Option<ShuntOp> {
    Some(match token {
        "(" => op(ShuntOpId::ParenL, 14, 0),
        ")" => op(ShuntOpId::ParenR, 14, 0),
        "+" => op(ShuntOpId::Plus, 8, 1),
        "-" => op(ShuntOpId::Minus, 8, 1),
        "NOT" => op(ShuntOpId::Not, 8, 1),
        _ => return None,
    })
}

fn binary_op(token: &str) -> Option<ShuntOp> {
    Some(match token {
        "(" => op(ShuntOpId::ParenL, 14, 0),
        ")" => op(ShuntOpId::ParenR, 14, 0),
        "PTR" => op(ShuntOpId::Ptr, 11, 2),
        "*" => op(ShuntOpId::Mul, 7, 2),
        "/" => op(ShuntOpId::Div, 7, 2),
        "MOD" => op(ShuntOpId::Mod, 7, 2),
        "SHR" => op(ShuntOpId::Shr, 7, 2),
        "SHL" => op(ShuntOpId::Shl, 7, 2),
        "+" => op(ShuntOpId::Plus, 6, 2),
        "-" => op(ShuntOpId::Minus, 6, 2),
        "EQ" => op(ShuntOpId::Eq, 5, 2),
        "NE" => op(ShuntOpId::Ne, 5, 2),
        "LT" => op(ShuntOpId::Lt, 5, 2),
        "LE" => op(ShuntOpId::Le, 5, 2),
        "GT" => op(ShuntOpId::Gt, 5, 2),
        "GE" => op(ShuntOpId::Ge, 5, 2),
        "AND" => op(ShuntOpId::And, 3, 2),
        "OR" | "|" => op(ShuntOpId::Or, 2, 2),
        "XOR" => op(ShuntOpId::Xor, 2, 2),
        _ => return None,
    })
}

/// Widths of the built-in type names usable as operands.
fn type_width(token: &str) -> Option<i64> {
    Some(match token {
        "BYTE" => 1,
        "WORD" => 2,
        "DWORD" => 4,
        "PWORD" | "FWORD" => 6,
        "QWORD" => 8,
        "TBYTE" => 10,
        _ => return None,
    })
}

/// One entry of the RPN tape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShuntVal {
    Int(AsmInt),
    Str(Vec<u8>),
    Op(ShuntOp),
}

impl fmt::Display for ShuntVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShuntVal::Int(i) => write!(f, "{i}"),
            ShuntVal::Str(s) => f.write_str(&crate::core::value::quote_ascii(s)),
            ShuntVal::Op(o) => write!(f, "{o}"),
        }
    }
}

fn fmt_tape(tape: &[ShuntVal]) -> String {
    tape.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

enum ShuntToken {
    Val(ShuntVal),
    Expr(String),
    Other(&'static str),
}

/// Reads the next operand or operator. Only operators of the active set
/// are recognised as such.
fn next_shunt_token(
    stream: &mut LexStream<'_>,
    op_set: OpSet,
    syms: &SymbolTable,
) -> (Option<ShuntToken>, ErrorList) {
    let token = stream.next_token(SHUNT_DELIM);
    if AsmInt::is_literal(token) {
        return match AsmInt::from_literal(token) {
            Ok(v) => (Some(ShuntToken::Val(ShuntVal::Int(v))), ErrorList::new()),
            Err(err) => (None, err),
        };
    }
    if token.len() == 1 && matches(QUOTES, token[0]) {
        let quote = token[0];
        let text = stream.next_until(&[quote]).to_vec();
        let err = stream.next_assert(quote, &text);
        return (Some(ShuntToken::Val(ShuntVal::Str(text))), err);
    }
    let upper = String::from_utf8_lossy(token).to_ascii_uppercase();
    if let Some(w) = type_width(&upper) {
        return (
            Some(ShuntToken::Val(ShuntVal::Int(AsmInt::new(w)))),
            ErrorList::new(),
        );
    }
    let found = match op_set {
        OpSet::Unary => unary_op(&upper),
        OpSet::Binary => binary_op(&upper),
    };
    if let Some(o) = found {
        return (Some(ShuntToken::Val(ShuntVal::Op(o))), ErrorList::new());
    }
    let name = String::from_utf8_lossy(token);
    match syms.get(&name) {
        Ok(AsmValue::Int(v)) => (Some(ShuntToken::Val(ShuntVal::Int(*v))), ErrorList::new()),
        Ok(AsmValue::Str(s)) => (
            Some(ShuntToken::Val(ShuntVal::Str(s.clone()))),
            ErrorList::new(),
        ),
        Ok(AsmValue::Expr(e)) => (Some(ShuntToken::Expr(e.clone())), ErrorList::new()),
        Ok(other) => (Some(ShuntToken::Other(other.thing())), ErrorList::new()),
        Err(err) => (None, err),
    }
}

struct ShuntState {
    ret: Vec<ShuntVal>,
    ops: Vec<ShuntOp>,
    op_set: OpSet,
}

/// Feeds one incoming operator into the yard. Operators push when their
/// precedence strictly exceeds the top of the stack; equal precedence pops
/// first.
fn push_op(state: &mut ShuntState, new_op: ShuntOp) -> ErrorList {
    let mut err = ErrorList::new();
    match new_op.id {
        ShuntOpId::ParenR => {
            loop {
                match state.ops.pop() {
                    Some(top) if top.id == ShuntOpId::ParenL => break,
                    Some(top) => state.ret.push(ShuntVal::Op(top)),
                    None => {
                        err.push(Severity::Error, "mismatched parentheses");
                        break;
                    }
                }
            }
            state.op_set = OpSet::Binary;
        }
        ShuntOpId::ParenL => {
            state.ops.push(new_op);
            state.op_set = OpSet::Unary;
        }
        _ => {
            while let Some(&top) = state.ops.last() {
                if top.id == ShuntOpId::ParenL || new_op.prec > top.prec {
                    break;
                }
                state.ret.push(ShuntVal::Op(top));
                state.ops.pop();
            }
            state.ops.push(new_op);
            state.op_set = OpSet::Unary;
        }
    }
    err
}

fn shunt_loop(state: &mut ShuntState, expr: &str, syms: &SymbolTable) -> ErrorList {
    let mut err = ErrorList::new();
    let mut stream = LexStream::new(expr.as_bytes());
    while stream.peek() != EOF && err.severity() < Severity::Error {
        let (token, token_err) = next_shunt_token(&mut stream, state.op_set, syms);
        let failed = token_err.severity() >= Severity::Error;
        err.merge(token_err);
        if failed {
            return err;
        }
        match token {
            Some(ShuntToken::Val(val @ ShuntVal::Int(_))) | Some(ShuntToken::Val(val @ ShuntVal::Str(_))) => {
                state.ret.push(val);
                state.op_set = OpSet::Binary;
            }
            Some(ShuntToken::Val(ShuntVal::Op(o))) => err.merge(push_op(state, o)),
            Some(ShuntToken::Expr(e)) => {
                // An expression symbol evaluates as if parenthesised.
                err.merge(push_op(state, op(ShuntOpId::ParenL, 14, 0)));
                err.merge(shunt_loop(state, &e, syms));
                err.merge(push_op(state, op(ShuntOpId::ParenR, 14, 0)));
            }
            Some(ShuntToken::Other(thing)) => err.push(
                Severity::Error,
                format!("can't use {thing} in arithmetic expression"),
            ),
            None => {}
        }
        stream.ignore(WHITESPACE);
    }
    err
}

/// Converts the arithmetic expression into an RPN tape.
pub fn shunt(expr: &str, syms: &SymbolTable) -> (Option<Vec<ShuntVal>>, ErrorList) {
    let mut state = ShuntState {
        ret: Vec::new(),
        ops: Vec::new(),
        op_set: OpSet::Unary,
    };
    let mut err = shunt_loop(&mut state, expr, syms);
    if err.severity() >= Severity::Error {
        return (None, err);
    }
    while let Some(top) = state.ops.pop() {
        if top.id == ShuntOpId::ParenL {
            err.push(Severity::Error, "missing a right parenthesis");
        } else {
            state.ret.push(ShuntVal::Op(top));
        }
    }
    (Some(state.ret), err)
}

fn calc_unary(o: ShuntOp, b: AsmInt) -> AsmInt {
    let mut a = AsmInt::with_base(0, b.base);
    match o.id {
        ShuntOpId::Plus => a.n = b.n,
        ShuntOpId::Minus => a.n = b.n.wrapping_neg(),
        ShuntOpId::Not => a.n = !b.n,
        _ => {}
    }
    a
}

fn calc_binary(o: ShuntOp, mut a: AsmInt, b: AsmInt) -> Result<AsmInt, ErrorList> {
    match o.id {
        ShuntOpId::Ptr => {
            a.ptr = a.n as u64;
            a.n = b.n;
            a.base = b.base;
        }
        ShuntOpId::Mul => a.n = a.n.wrapping_mul(b.n),
        ShuntOpId::Div => {
            if b.n == 0 {
                return Err(ErrorList::of(Severity::Error, "division by zero"));
            }
            a.n = a.n.wrapping_div(b.n);
        }
        ShuntOpId::Mod => {
            if b.n == 0 {
                return Err(ErrorList::of(Severity::Error, "division by zero"));
            }
            a.n = a.n.wrapping_rem(b.n);
        }
        ShuntOpId::Shr => {
            let count = b.n as u64;
            a.n = if count >= 64 { a.n >> 63 } else { a.n >> count };
        }
        ShuntOpId::Shl => {
            let count = b.n as u64;
            a.n = if count >= 64 {
                0
            } else {
                a.n.wrapping_shl(count as u32)
            };
        }
        ShuntOpId::Plus => {
            // Adding two character constants concatenates their bytes.
            if a.base == 256 && b.base == 256 {
                let shift = b.width() * 8;
                a.n = if shift >= 64 {
                    b.n
                } else {
                    (a.n << shift) | b.n
                };
            } else {
                a.n = a.n.wrapping_add(b.n);
            }
        }
        ShuntOpId::Minus => a.n = a.n.wrapping_sub(b.n),
        ShuntOpId::Eq => a.n = (a.n == b.n) as i64,
        ShuntOpId::Ne => a.n = (a.n != b.n) as i64,
        ShuntOpId::Lt => a.n = (a.n < b.n) as i64,
        ShuntOpId::Le => a.n = (a.n <= b.n) as i64,
        ShuntOpId::Gt => a.n = (a.n > b.n) as i64,
        ShuntOpId::Ge => a.n = (a.n >= b.n) as i64,
        ShuntOpId::And => a.n &= b.n,
        ShuntOpId::Or => a.n |= b.n,
        ShuntOpId::Xor => a.n ^= b.n,
        _ => {}
    }
    Ok(a)
}

/// Evaluates the RPN tape down to a single integer.
pub fn solve(tape: &[ShuntVal]) -> (Option<AsmInt>, ErrorList) {
    let mut err = ErrorList::new();
    let mut stack: Vec<AsmInt> = Vec::with_capacity(tape.len());
    for val in tape {
        match val {
            ShuntVal::Int(i) => stack.push(*i),
            ShuntVal::Str(s) => match string_to_int(s) {
                Ok(i) => stack.push(i),
                Err(e) => err.merge(e),
            },
            ShuntVal::Op(o) => {
                if stack.len() < o.args as usize {
                    err.push(Severity::Error, "arithmetic stack underflow");
                    continue;
                }
                if o.args == 1 {
                    let b = stack.pop().unwrap();
                    stack.push(calc_unary(*o, b));
                } else {
                    let b = stack.pop().unwrap();
                    let a = stack.pop().unwrap();
                    match calc_binary(*o, a, b) {
                        Ok(v) => stack.push(v),
                        Err(e) => err.merge(e),
                    }
                }
            }
        }
    }
    if stack.len() != 1 {
        err.push(
            Severity::Error,
            format!("invalid RPN expression: {}", fmt_tape(tape)),
        );
        return (None, err);
    }
    (Some(stack[0]), err)
}

/// Shunts and solves, checking the result against the active word size.
pub fn eval_int(
    syms: &SymbolTable,
    expr: &str,
    wordsize: u32,
) -> (Option<AsmInt>, ErrorList) {
    let (tape, mut err) = shunt(expr, syms);
    let Some(tape) = tape else {
        return (None, err);
    };
    if err.severity() >= Severity::Error {
        return (None, err);
    }
    let (ret, solve_err) = solve(&tape);
    err.merge(solve_err);
    if let Some(v) = &ret {
        if v.width() > wordsize {
            err.push(
                Severity::Error,
                format!(
                    "arithmetic overflow: {} exceeds the current {}-bit word size",
                    v,
                    wordsize * 8
                ),
            );
        }
    }
    (ret, err)
}

/// Evaluates an expression as a condition.
pub fn eval_bool(syms: &SymbolTable, expr: &str, wordsize: u32) -> (bool, ErrorList) {
    let (ret, err) = eval_int(syms, expr, wordsize);
    if err.severity() < Severity::Error {
        (ret.is_some_and(|v| v.n != 0), err)
    } else {
        (false, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn syms() -> SymbolTable {
        SymbolTable::new(false)
    }

    fn eval(expr: &str) -> AsmInt {
        let table = syms();
        let (ret, err) = eval_int(&table, expr, 8);
        assert!(
            err.severity() < Severity::Error,
            "eval of {expr:?} failed: {:?}",
            err.entries()
        );
        ret.expect("no result")
    }

    fn eval_err(expr: &str) -> ErrorList {
        let table = syms();
        let (_, err) = eval_int(&table, expr, 8);
        assert!(err.severity() >= Severity::Error, "eval of {expr:?} passed");
        err
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(eval("5 + 3 * 2").n, 11);
        assert_eq!(eval("3 * 2 + 5").n, 11);
    }

    #[test]
    fn equal_precedence_associates_left() {
        assert_eq!(eval("8 - 4 - 2").n, 2);
        assert_eq!(eval("16 / 4 / 2").n, 2);
    }

    #[test]
    fn parentheses_override() {
        assert_eq!(eval("(5 + 3) * 2").n, 16);
        assert_eq!(eval("((2))").n, 2);
    }

    #[test]
    fn unary_signs_and_not() {
        assert_eq!(eval("-5 + 3").n, -2);
        assert_eq!(eval("+5").n, 5);
        assert_eq!(eval("NOT 0").n, -1);
        assert_eq!(eval("NOT 2 + 3").n, 0, "NOT binds tighter than +");
    }

    #[test]
    fn comparisons_yield_zero_or_one() {
        assert_eq!(eval("1 EQ 1").n, 1);
        assert_eq!(eval("1 NE 1").n, 0);
        assert_eq!(eval("2 LT 3").n, 1);
        assert_eq!(eval("2 GE 3").n, 0);
        assert_eq!(eval("3 LE 3").n, 1);
        assert_eq!(eval("4 GT 3").n, 1);
    }

    #[test]
    fn bitwise_and_shift_set() {
        assert_eq!(eval("12 AND 10").n, 8);
        assert_eq!(eval("12 OR 3").n, 15);
        assert_eq!(eval("12 | 3").n, 15);
        assert_eq!(eval("12 XOR 10").n, 6);
        assert_eq!(eval("1 SHL 4").n, 16);
        assert_eq!(eval("16 SHR 4").n, 1);
        assert_eq!(eval("7 MOD 4").n, 3);
        assert_eq!(eval("-7 / 2").n, -3, "division truncates toward zero");
        assert_eq!(eval("-7 MOD 2").n, -1);
    }

    #[test]
    fn ptr_sets_pointer_width() {
        let v = eval("WORD PTR 16");
        assert_eq!(v.ptr, 2);
        assert_eq!(v.n, 16);
    }

    #[test]
    fn type_names_are_their_widths() {
        assert_eq!(eval("TBYTE").n, 10);
        assert_eq!(eval("FWORD").n, 6);
    }

    #[test]
    fn adding_strings_concatenates_their_bytes() {
        let v = eval("\"A\" + \"B\"");
        assert_eq!(v.n, 0x4142);
        assert_eq!(v.base, 256);
        assert_eq!(v.to_string(), "\"AB\"");
        let v = eval("'AB' + 'C'");
        assert_eq!(v.n, 0x414243);
    }

    #[test]
    fn string_plus_number_stays_arithmetic() {
        let v = eval("'A' + 1");
        assert_eq!(v.n, 0x42);
    }

    #[test]
    fn hex_literal_keeps_base() {
        let v = eval("0FFh + 1");
        assert_eq!(v.n, 0x100);
        assert_eq!(v.base, 16);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        eval_err("1 / 0");
        eval_err("1 MOD 0");
    }

    #[test]
    fn mismatched_parens_are_errors() {
        let err = eval_err("(1 + 2");
        assert!(err.entries()[0].message.contains("right parenthesis"));
        let err = eval_err("1 + 2)");
        assert!(err
            .entries()
            .iter()
            .any(|e| e.message.contains("mismatched parentheses")));
    }

    #[test]
    fn dangling_operator_underflows() {
        let err = eval_err("1 +");
        assert!(err
            .entries()
            .iter()
            .any(|e| e.message.contains("stack underflow")
                || e.message.contains("invalid RPN expression")));
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        let err = eval_err("nobody");
        assert!(err.entries()[0].message.contains("unknown symbol NOBODY"));
    }

    #[test]
    fn expression_symbols_expand_inline() {
        let mut table = syms();
        table.set("Y", AsmValue::Expr("1+2".to_string()), true);
        let (ret, err) = eval_int(&table, "Y * 10", 8);
        assert!(err.severity() < Severity::Error);
        assert_eq!(ret.unwrap().n, 30);
    }

    #[test]
    fn non_numeric_symbols_are_rejected() {
        let mut table = syms();
        table.set(
            "M",
            AsmValue::Macro(crate::core::value::MacroDef {
                args: Vec::new(),
                code: Vec::new(),
                locals: Vec::new(),
            }),
            false,
        );
        let err = eval_err2(&table, "M + 1");
        assert!(err.entries()[0]
            .message
            .contains("can't use multiline macro in arithmetic expression"));
    }

    fn eval_err2(table: &SymbolTable, expr: &str) -> ErrorList {
        let (_, err) = eval_int(table, expr, 8);
        assert!(err.severity() >= Severity::Error);
        err
    }

    #[test]
    fn wordsize_overflow_is_reported() {
        let table = syms();
        let (ret, err) = eval_int(&table, "70000", 2);
        assert_eq!(ret.unwrap().n, 70000);
        assert_eq!(err.severity(), Severity::Error);
        assert!(err.entries()[0].message.contains("16-bit word size"));
        let (_, err) = eval_int(&table, "70000", 4);
        assert!(err.is_empty());
    }

    proptest! {
        #[test]
        fn addition_commutes(a in any::<i32>(), b in any::<i32>()) {
            let table = syms();
            let lhs = format!("{a} + {b}");
            let rhs = format!("{b} + {a}");
            let (x, _) = eval_int(&table, &lhs, 8);
            let (y, _) = eval_int(&table, &rhs, 8);
            prop_assert_eq!(x.unwrap().n, y.unwrap().n);
        }

        #[test]
        fn multiplication_commutes(a in any::<i32>(), b in any::<i32>()) {
            let table = syms();
            let (x, _) = eval_int(&table, &format!("{a} * {b}"), 8);
            let (y, _) = eval_int(&table, &format!("{b} * {a}"), 8);
            prop_assert_eq!(x.unwrap().n, y.unwrap().n);
        }

        #[test]
        fn tape_solves_to_exactly_one_value(a in any::<i16>(), b in any::<i16>(), c in any::<i16>()) {
            let table = syms();
            let expr = format!("({a} + {b}) * {c} - {a}");
            let (tape, err) = shunt(&expr, &table);
            prop_assert!(err.severity() < Severity::Error);
            let (ret, err) = solve(&tape.unwrap());
            prop_assert!(err.severity() < Severity::Error);
            prop_assert!(ret.is_some());
        }
    }
}
