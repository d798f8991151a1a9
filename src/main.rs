//! harambe compiler front end
//!
//! Reads a source file, parses it, runs name analysis, and writes the
//! annotated unparse to the output file.

mod frontend;
mod utils;

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;

use frontend::analyze::NameAnalyzer;
use frontend::lexer::Lexer;
use frontend::parser::Parser;
use frontend::unparse::unparse;

/// harambe compiler front end
#[derive(ClapParser, Debug)]
#[command(name = "harambec")]
#[command(version = "0.1.0")]
#[command(about = "harambe front end - parse, name-analyze, unparse")]
struct Cli {
    /// Input source file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file for the annotated unparse
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> ExitCode {
    let source = match fs::read_to_string(&cli.input) {
        Ok(source) => source,
        Err(_) => {
            eprintln!("File {} not found.", cli.input.display());
            return ExitCode::FAILURE;
        }
    };

    let mut out = match fs::File::create(&cli.output) {
        Ok(out) => out,
        Err(_) => {
            eprintln!(
                "File {} could not be opened for writing.",
                cli.output.display()
            );
            return ExitCode::FAILURE;
        }
    };

    let mut program = match Parser::new(Lexer::new(&source)).parse_program() {
        Ok(program) => {
            println!("program parsed correctly.");
            program
        }
        Err(err) => {
            eprintln!("Exception occured during parse: {err}");
            return ExitCode::FAILURE;
        }
    };

    // Name-analysis diagnostics stream to stderr in walk order; the
    // annotated unparse is written whether or not any were reported.
    let mut analyzer = NameAnalyzer::new();
    analyzer.analyze(&mut program);
    if analyzer.any_error() {
        eprintln!("Errors occured during name analyze");
    } else {
        println!("name analyze succeeded");
    }

    if out.write_all(unparse(&program).as_bytes()).is_err() {
        eprintln!(
            "File {} could not be opened for writing.",
            cli.output.display()
        );
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
