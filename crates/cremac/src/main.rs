//! Crema compiler command-line driver.
//!
//! Drives the core pipeline over one translation unit: parse, analyze,
//! lower, write IR text. Native code generation and linking against the
//! runtime library are external steps consuming the `-S` output.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use crema_core::Compiler;

#[derive(Parser)]
#[command(name = "cremac")]
#[command(author, version, about = "Crema compiler", long_about = None)]
struct Cli {
    /// Input source file
    #[arg(short = 'f', value_name = "PATH")]
    file: PathBuf,

    /// Stop after parsing and pretty-print the tree
    #[arg(short = 'p')]
    parse_only: bool,

    /// Stop after semantic analysis
    #[arg(short = 's')]
    analyze_only: bool,

    /// Write IR text to this path (defaults to NAME.ll)
    #[arg(short = 'S', value_name = "OUT.ll")]
    ir_out: Option<PathBuf>,

    /// Output program name
    #[arg(short = 'o', value_name = "NAME", default_value = "a.out")]
    output: String,

    /// Dump the AST as JSON after parsing
    #[arg(short = 'v')]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("cremac: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut compiler = Compiler::new();

    let mut program = match compiler.load_file(&cli.file) {
        Ok(program) => program,
        Err(_) => {
            eprintln!("{}", compiler.render_diagnostics());
            return Ok(ExitCode::FAILURE);
        }
    };

    if cli.verbose {
        println!(
            "{}",
            serde_json::to_string_pretty(&program).context("failed to serialize AST")?
        );
    }

    if cli.parse_only {
        print!("{}", program.pretty());
        return Ok(ExitCode::SUCCESS);
    }

    let ok = compiler.analyze(&mut program);
    let diagnostics = compiler.render_diagnostics();
    if !diagnostics.is_empty() {
        eprintln!("{}", diagnostics);
    }
    if !ok {
        return Ok(ExitCode::FAILURE);
    }

    if cli.analyze_only {
        return Ok(ExitCode::SUCCESS);
    }

    let module = compiler.lower(&program, &cli.output);
    let ir_text = compiler.render_ir(&module);

    let ir_path = cli
        .ir_out
        .unwrap_or_else(|| PathBuf::from(format!("{}.ll", cli.output)));
    fs::write(&ir_path, ir_text)
        .with_context(|| format!("failed to write IR to {}", ir_path.display()))?;

    Ok(ExitCode::SUCCESS)
}
