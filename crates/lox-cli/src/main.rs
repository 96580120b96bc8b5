//! `lox` : binaire principal
//!
//! Ici on fait uniquement : parsing d'arguments, initialisation du logger, et
//! délégation à `lox_cli` (lib).

#![forbid(unsafe_code)]

use std::{io::Write, path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{ArgAction, Parser};

use lox_cli as cli; // notre lib interne (src/lib.rs)
use lox_vm::{DEFAULT_STACK_MAX, STACK_MAX_LIMIT};

// ──────────────────────────── CLI (clap) ────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "lox", version, about = "Lox : REPL, exécution de scripts, désassemblage", long_about = None)]
struct Opt {
    /// Augmente la verbosité (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Mode silencieux (casse la verbosité)
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,

    /// Afficher le listing du bytecode au lieu d'exécuter
    #[arg(long, requires = "path")]
    disassemble: bool,

    /// Tracer chaque instruction exécutée (pile + désassemblage)
    #[arg(long = "trace-execution")]
    trace_execution: bool,

    /// Journaliser le listing de chaque chunk compilé
    #[arg(long = "print-code")]
    print_code: bool,

    /// Capacité de la pile d'opérandes
    #[arg(long = "stack-max", value_name = "N", default_value_t = DEFAULT_STACK_MAX, value_parser = parse_stack_max)]
    stack_max: usize,

    /// Script à exécuter (REPL si omis)
    path: Option<PathBuf>,
}

fn parse_stack_max(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n @ 1..=STACK_MAX_LIMIT) => Ok(n),
        Ok(_) => Err(format!("must be between 1 and {STACK_MAX_LIMIT}")),
        Err(e) => Err(e.to_string()),
    }
}

impl Opt {
    fn command(&self) -> cli::Command {
        match (&self.path, self.disassemble) {
            (None, _) => cli::Command::Repl,
            (Some(p), false) => cli::Command::Run(p.clone()),
            (Some(p), true) => cli::Command::Disassemble(p.clone()),
        }
    }

    const fn run_options(&self) -> cli::RunOptions {
        cli::RunOptions {
            stack_max: self.stack_max,
            trace_execution: self.trace_execution,
            print_code: self.print_code,
        }
    }
}

// ──────────────────────────── Logger / Verbosité ────────────────────────────

fn init_telemetry(opt: &Opt) {
    #[cfg(feature = "trace")]
    {
        let level = if opt.quiet {
            "error"
        } else {
            match opt.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        };
        // les drapeaux de debug ouvrent leur cible, quel que soit -v
        let mut filter = level.to_owned();
        if opt.print_code {
            filter.push_str(",lox_compiler=debug");
        }
        if opt.trace_execution {
            filter.push_str(",lox_vm=trace");
        }
        std::env::set_var("RUST_LOG", std::env::var("RUST_LOG").unwrap_or(filter));
        cli::init_logger();
    }
    #[cfg(not(feature = "trace"))]
    let _ = opt;
}

// ──────────────────────────── main ────────────────────────────

fn main() -> ExitCode {
    let opt = match Opt::try_parse() {
        Ok(opt) => opt,
        Err(e) => {
            // --help / --version vont sur stdout et sortent à 0
            let code = if e.use_stderr() { cli::exit::USAGE } else { cli::exit::OK };
            let _ = e.print();
            return ExitCode::from(code);
        },
    };

    match real_main(&opt) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            let _ = writeln!(std::io::stderr(), "error: {e:#}");
            ExitCode::from(cli::exit::IOERR)
        },
    }
}

fn real_main(opt: &Opt) -> Result<u8> {
    init_telemetry(opt);
    cli::execute(opt.command(), &opt.run_options())
}

// ──────────────────────────── Tests ────────────────────────────
