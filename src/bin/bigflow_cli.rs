//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

use bigflow::{Base, Context};
use clap::Parser;
use log::Level;
use std::path::PathBuf;
use std::str::FromStr;

/// Evaluates a `+`-chained integer-literal expression.
#[derive(Parser)]
#[command(name = "bigflow-cli", version, about = "Multi-precision integer arithmetic over a deferred DAG")]
struct Args {
    /// Expression, e.g. "12345678901234567890 + -42 + 7"
    expression: String,

    /// Limb base
    #[arg(long, default_value = "dec")]
    base: BaseArg,

    /// Minimum precision to reserve, in base-10 digits
    #[arg(long, default_value_t = 64)]
    precision: usize,

    /// Write dag.json/pro.json describing the evaluated graph into DIR
    #[arg(long)]
    export_graph: Option<PathBuf>,

    #[arg(long, default_value = "warn")]
    log_level: String,

    #[arg(long, default_value = "bigflow.log")]
    log_file: PathBuf,
}

#[derive(Clone, Copy)]
struct BaseArg(Base);

impl FromStr for BaseArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oct" => Ok(BaseArg(Base::Oct)),
            "dec" => Ok(BaseArg(Base::Dec)),
            "hex" => Ok(BaseArg(Base::Hex)),
            other => Err(format!("unknown base '{other}' (expected oct, dec, or hex)")),
        }
    }
}

fn install_logging(level: &str, path: PathBuf) {
    let threshold = Level::from_str(level).unwrap_or(Level::Warn);
    let logger = bigflow::logging::Logger::new(path, threshold, 4096);
    if logger.install().is_err() {
        eprintln!("bigflow-cli: a logger was already installed, ignoring --log-level/--log-file");
    }
}

fn main() {
    let args = Args::parse();
    install_logging(&args.log_level, args.log_file.clone());

    let ctx = Context::new(args.precision, args.base.0);
    let mut handles = Vec::new();
    for term in args.expression.split('+') {
        let term = term.trim();
        if term.is_empty() {
            eprintln!("bigflow-cli: empty term in expression");
            std::process::exit(1);
        }
        match ctx.make_integer(term) {
            Ok(h) => handles.push(h),
            Err(e) => {
                eprintln!("bigflow-cli: failed to parse '{term}': {e}");
                std::process::exit(1);
            }
        }
    }
    let Some(mut acc) = handles.first().cloned() else {
        eprintln!("bigflow-cli: expression had no terms");
        std::process::exit(1);
    };
    for h in &handles[1..] {
        acc = match ctx.add(&acc, h) {
            Ok(sum) => sum,
            Err(e) => {
                eprintln!("bigflow-cli: {e}");
                std::process::exit(1);
            }
        };
    }

    if let Err(e) = ctx.generate_procedures() {
        eprintln!("bigflow-cli: {e}");
        std::process::exit(1);
    }
    if let Err(e) = ctx.evaluate() {
        eprintln!("bigflow-cli: {e}");
        std::process::exit(1);
    }
    ctx.wait();

    match ctx.format(&acc) {
        Ok(result) => println!("{result}"),
        Err(e) => {
            eprintln!("bigflow-cli: {e}");
            std::process::exit(1);
        }
    }

    if let Some(dir) = args.export_graph {
        if let Err(e) = ctx.export_graph(&dir) {
            eprintln!("bigflow-cli: failed to export graph to {}: {e}", dir.display());
            std::process::exit(1);
        }
    }
}
