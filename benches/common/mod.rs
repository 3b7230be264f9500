#![allow(dead_code)]
use std::fs;

use numscript::ast::Program;
use numscript::parser::Parser;

pub const WORKLOADS: [(&str, &str); 2] = [
    ("fib", "tests/programs/bench_fib/program.ns"),
    ("arith", "tests/programs/bench_arith/program.ns"),
];

pub fn workloads() -> [(&'static str, &'static str); 2] {
    WORKLOADS
}

pub fn load_source(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| panic!("read {path}: {err}"))
}

pub fn load_program(path: &str) -> Program {
    let source = load_source(path);
    Parser::new(&source)
        .and_then(|parser| parser.parse())
        .unwrap_or_else(|err| panic!("parse {path}: {err}"))
}
