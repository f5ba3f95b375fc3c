//! veriwp CLI

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use veriwp::ast::FreshNames;
use veriwp::config::VerifyConfig;
use veriwp::error::report_error;
use veriwp::source::{load_module, SourceModule};
use veriwp::verify::{FunctionSession, VerificationRun};
use veriwp::VerifyError;

#[derive(Parser)]
#[command(name = "veriwp", version, about = "Weakest-precondition verifier for annotated Python functions")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify the annotated functions of a source file
    Check(CheckArgs),
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
    /// Parse a single assertion and print it (debug)
    Assertion {
        /// Assertion text, e.g. 'forall i :: i >= 0 ==> xs[i] > 0'
        text: String,
    },
}

#[derive(Args)]
struct CheckArgs {
    /// Source file to verify
    file: PathBuf,

    /// Configuration file (default: veriwp.toml next to FILE)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only verify this scope
    #[arg(long)]
    scope: Option<String>,

    /// Keep going after a failing function
    #[arg(long)]
    collect: bool,

    /// Z3 executable
    #[arg(long)]
    z3: Option<String>,

    /// Solver timeout per check in milliseconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the translated IR of each function
    #[arg(long)]
    emit_ir: bool,

    /// Print the verification conditions of each function
    #[arg(long)]
    emit_vc: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Check(args) => check_file(&args),
        Command::Tokens { file } => tokenize_file(&file),
        Command::Assertion { text } => parse_assertion(&text),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Print `error` against `source`, falling back to plain text
fn report(filename: &str, source: &str, error: &VerifyError) -> ExitCode {
    if report_error(filename, source, error).is_err() {
        eprintln!("Error: {error}");
    }
    ExitCode::FAILURE
}

fn read_source(path: &Path) -> Result<String, ExitCode> {
    std::fs::read_to_string(path).map_err(|e| {
        eprintln!("Error: cannot read {}: {e}", path.display());
        ExitCode::FAILURE
    })
}

fn check_file(args: &CheckArgs) -> ExitCode {
    let source = match read_source(&args.file) {
        Ok(source) => source,
        Err(code) => return code,
    };
    let filename = args.file.display().to_string();

    match run_check(args, &source) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => report(&filename, &source, &e),
    }
}

fn run_check(args: &CheckArgs, source: &str) -> veriwp::Result<bool> {
    let mut config = match &args.config {
        Some(path) => VerifyConfig::load(path)?,
        None => VerifyConfig::discover(&args.file)?,
    };
    if let Some(z3) = &args.z3 {
        config.z3_path = z3.clone();
    }
    if args.timeout.is_some() {
        config.timeout_ms = args.timeout;
    }
    if args.collect {
        config.fail_fast = false;
    }

    let default_scope = args
        .file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("main");
    let module = load_module(source, default_scope)?;

    if args.emit_ir || args.emit_vc {
        emit(&module, args, &config)?;
    }

    let mut run = VerificationRun::new(module, &config);
    let report = match &args.scope {
        Some(name) => run.verify_scope(name)?,
        None => run.verify_all()?,
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| VerifyError::io_error(e.to_string()))?;
        println!("{json}");
    } else {
        print!("{report}");
    }
    Ok(report.all_verified())
}

fn emit(module: &SourceModule, args: &CheckArgs, config: &VerifyConfig) -> veriwp::Result<()> {
    let scopes = module
        .scopes
        .iter()
        .filter(|s| args.scope.as_ref().is_none_or(|name| &s.name == name));
    for scope in scopes {
        for function in &scope.functions {
            let mut session = FunctionSession::new(function);
            session.prepare(&config.builtins)?;
            println!("# {}::{}", scope.name, function.name);
            if args.emit_ir
                && let Some(ir) = session.ir()
            {
                print!("{ir}");
            }
            if args.emit_vc {
                for obligation in session.obligations() {
                    println!("{}: {}", obligation.kind, obligation.formula);
                }
            }
        }
    }
    Ok(())
}

fn tokenize_file(path: &Path) -> ExitCode {
    let source = match read_source(path) {
        Ok(source) => source,
        Err(code) => return code,
    };

    match veriwp::lexer::tokenize_module(&source) {
        Ok(tokens) => {
            for (tok, span) in &tokens {
                println!("{:?} @ {}..{}", tok, span.start, span.end);
            }
            ExitCode::SUCCESS
        }
        Err(e) => report(&path.display().to_string(), &source, &e),
    }
}

fn parse_assertion(text: &str) -> ExitCode {
    match veriwp::parser::parse_assertion(text, &mut FreshNames::new()) {
        Ok(expr) => {
            println!("{expr}");
            ExitCode::SUCCESS
        }
        Err(e) => report("<assertion>", text, &e),
    }
}
