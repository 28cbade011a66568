use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use loxide as lox;

use lox::ast_printer::AstPrinter;
use lox::lox::{Lox, RunOutcome};
use lox::parser::Parser;
use lox::scanner::Scanner;
use lox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Emit the token list as JSON instead of one line per token
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints each statement's AST
    Parse { filename: PathBuf },

    /// Runs a file as a Lox program, or starts a REPL without one
    Run { filename: Option<PathBuf> },
}

/// Memory-maps a script read-only; the scanner works straight off the map.
fn map_file(filename: &PathBuf) -> Result<Mmap> {
    info!("Mapping file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mmap =
        unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    info!("Mapped {} bytes from {:?}", mmap.len(), filename);

    Ok(mmap)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Write to file with module path and source line
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("loxide::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn tokenize(filename: &PathBuf, json: bool) -> Result<ExitCode> {
    info!("Running Tokenize subcommand");

    let mmap = map_file(filename)?;
    let mut tokens: Vec<Token> = Vec::new();
    let mut tokenized = true;

    for result in Scanner::new(&mmap) {
        match result {
            Ok(token) => {
                debug!("Scanned token: {}", token);

                if json {
                    tokens.push(token);
                } else {
                    println!("{}", token);
                }
            }

            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");

        return Ok(ExitCode::from(65));
    }

    info!("Tokenization completed successfully");
    Ok(ExitCode::SUCCESS)
}

fn parse(filename: &PathBuf) -> Result<ExitCode> {
    info!("Running Parse subcommand");

    let mmap = map_file(filename)?;
    let mut tokens: Vec<Token> = Vec::new();
    let mut lexed = true;

    for result in Scanner::new(&mmap) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => {
                lexed = false;
                eprintln!("{}", e);
            }
        }
    }

    let (statements, errors) = Parser::new(&tokens).parse();
    for error in &errors {
        eprintln!("{}", error);
    }

    if !lexed || !errors.is_empty() {
        return Ok(ExitCode::from(65));
    }

    for statement in &statements {
        println!("{}", AstPrinter::print_stmt(statement));
    }

    info!("Parse subcommand completed");
    Ok(ExitCode::SUCCESS)
}

fn run_file(filename: &PathBuf) -> Result<ExitCode> {
    info!("Running Run subcommand on {:?}", filename);

    let mmap = map_file(filename)?;
    let mut lox = Lox::stdio();

    let code = match lox.run(&mmap) {
        RunOutcome::Success => ExitCode::SUCCESS,
        RunOutcome::StaticError => ExitCode::from(65),
        RunOutcome::RuntimeError => ExitCode::from(70),
    };

    Ok(code)
}

/// Interactive prompt: each line runs as an independent program with a fresh
/// error state; an empty line (or EOF) exits.
fn run_prompt() -> Result<ExitCode> {
    info!("Starting REPL");

    let mut lox = Lox::stdio();
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        let bytes = stdin.lock().read_line(&mut line)?;
        let line = line.trim_end_matches('\n');

        if bytes == 0 || line.is_empty() {
            break;
        }

        lox.run(line.as_bytes());
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match &args.commands {
        Commands::Tokenize { filename, json } => tokenize(filename, *json),

        Commands::Parse { filename } => parse(filename),

        Commands::Run { filename } => match filename {
            Some(filename) => run_file(filename),
            None => run_prompt(),
        },
    }
}
