//! lox-cli : bibliothèque interne du binaire `lox`
//!
//! Le parsing d'arguments reste dans `main.rs` ; ici on garde ce qui se teste :
//! - boucle REPL générique sur n'importe quel `BufRead` / `Write`
//! - exécution d'un fichier source et traduction du résultat en code de sortie
//! - désassemblage d'un fichier sans exécution
//! - traces (`feature = "trace"`) via `env_logger`

#![deny(unused_must_use)]
#![forbid(unsafe_code)]

use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use lox_core::bytecode::disassemble_chunk;
use lox_core::diagnostic::CompileFn;
use lox_vm::{InterpretResult, Vm, VmConfig, DEFAULT_STACK_MAX};

// ───────────────────────────── Codes de sortie ─────────────────────────────

/// Codes de sortie (convention sysexits).
pub mod exit {
    /// Succès.
    pub const OK: u8 = 0;
    /// Mauvais usage de la ligne de commande.
    pub const USAGE: u8 = 64;
    /// Erreur de compilation.
    pub const DATAERR: u8 = 65;
    /// Erreur d'exécution.
    pub const SOFTWARE: u8 = 70;
    /// Fichier illisible, sortie impossible.
    pub const IOERR: u8 = 74;
}

// ───────────────────────────── Types publics ─────────────────────────────

/// Commande haut-niveau (le parsing CLI reste dans main.rs).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Session interactive sur stdin.
    Repl,
    /// Interpréter un fichier source.
    Run(PathBuf),
    /// Compiler un fichier et afficher son listing.
    Disassemble(PathBuf),
}

/// Réglages de la VM et du compilateur choisis en ligne de commande.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Capacité de la pile d'opérandes.
    pub stack_max: usize,
    /// Trace chaque instruction (niveau `trace`).
    pub trace_execution: bool,
    /// Journalise le listing de chaque chunk compilé (niveau `debug`).
    pub print_code: bool,
}

impl Default for RunOptions {
    fn default() -> Self { Self { stack_max: DEFAULT_STACK_MAX, trace_execution: false, print_code: false } }
}

impl RunOptions {
    /// Configuration VM correspondante.
    #[must_use]
    pub fn vm_config(&self) -> VmConfig {
        VmConfig::new().with_stack_max(self.stack_max).with_trace_execution(self.trace_execution)
    }

    /// VM prête à l'emploi, erreurs sur stderr.
    #[must_use]
    pub fn vm(&self) -> Vm {
        let compiler: CompileFn = if self.print_code { lox_compiler::compile_and_print } else { lox_compiler::compile };
        Vm::with_compiler(self.vm_config(), compiler)
    }
}

// ───────────────────────────── Initialisation ─────────────────────────────

/// Initialise le logger selon la feature `trace`.
pub fn init_logger() {
    #[cfg(feature = "trace")]
    {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .try_init();
    }
}

// ───────────────────────────── Exécution ─────────────────────────────

/// Exécute une commande sur les flux standards. Retourne un code de sortie.
///
/// # Errors
/// Échec d'écriture sur stdout / stderr.
pub fn execute(cmd: Command, opts: &RunOptions) -> Result<u8> {
    let stdout = io::stdout();
    let stderr = io::stderr();
    match cmd {
        Command::Repl => {
            let mut vm = opts.vm();
            repl(&mut vm, io::stdin().lock(), &mut stdout.lock())?;
            release(vm);
            Ok(exit::OK)
        },
        Command::Run(path) => run_file(&path, opts.vm(), &mut stdout.lock(), &mut stderr.lock()),
        Command::Disassemble(path) => {
            disassemble_file(&path, opts.vm(), &mut stdout.lock(), &mut stderr.lock())
        },
    }
}

/// Bannière affichée à l'ouverture du REPL.
#[must_use]
pub fn banner() -> String { format!("Lox {} (Ctrl-D to exit)", env!("CARGO_PKG_VERSION")) }

/// Boucle interactive : une ligne, une passe d'interprétation.
///
/// Le résultat de chaque passe réussie est affiché ; les erreurs partent
/// dans le puits de la VM et la session continue. Fin de flux : fin de
/// session. Les lignes vides sont ignorées.
///
/// # Errors
/// Lecture de `input` ou écriture sur `out` impossible.
pub fn repl<R: BufRead, W: Write>(vm: &mut Vm, mut input: R, out: &mut W) -> Result<()> {
    writeln!(out, "{}", banner())?;
    let mut line = String::new();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line).context("lecture de l'entrée")? == 0 {
            writeln!(out)?;
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }
        if let InterpretResult::Ok(value) = vm.interpret(&line) {
            writeln!(out, "{}", vm.heap().display(value))?;
        }
    }
}

/// Interprète le fichier `path` ; le résultat va sur `out`.
///
/// Retourne 0, 65 ou 70 selon l'issue de la passe, 74 si le fichier est
/// illisible (message sur `err`).
///
/// # Errors
/// Écriture sur `out` / `err` impossible.
pub fn run_file<O: Write, E: Write>(path: &Path, mut vm: Vm, out: &mut O, err: &mut E) -> Result<u8> {
    let Some(source) = load(path, err)? else {
        return Ok(exit::IOERR);
    };

    let result = vm.interpret(&source);
    if let InterpretResult::Ok(value) = result {
        writeln!(out, "{}", vm.heap().display(value))?;
    }
    release(vm);
    Ok(result.exit_code())
}

/// Compile `path` et écrit son listing sur `out` sans l'exécuter.
///
/// Retourne 0, 65 si la compilation échoue (diagnostics sur `err`), 74 si le
/// fichier est illisible.
///
/// # Errors
/// Écriture sur `out` / `err` impossible.
pub fn disassemble_file<O: Write, E: Write>(path: &Path, mut vm: Vm, out: &mut O, err: &mut E) -> Result<u8> {
    let Some(source) = load(path, err)? else {
        return Ok(exit::IOERR);
    };

    let code = match vm.compile(&source) {
        Ok(mut chunk) => {
            write!(out, "{}", disassemble_chunk(&chunk, vm.heap(), &display(path)))?;
            chunk.release();
            exit::OK
        },
        Err(diagnostics) => {
            writeln!(err, "{diagnostics}")?;
            exit::DATAERR
        },
    };
    release(vm);
    Ok(code)
}

// ───────────────────────────── Utilitaires ─────────────────────────────

/// Contenu de `path`, ou `None` après avoir signalé l'échec sur `err`.
fn load<E: Write>(path: &Path, err: &mut E) -> Result<Option<String>> {
    match read_source(path) {
        Ok(source) => Ok(Some(source)),
        Err(e) => {
            writeln!(err, "{e:#}")?;
            Ok(None)
        },
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Could not read file \"{}\"", display(path)))
}

fn release(vm: Vm) {
    let stats = vm.teardown();
    #[cfg(feature = "trace")]
    log::debug!("heap libéré : {} objets, {} octets", stats.objects, stats.bytes);
    #[cfg(not(feature = "trace"))]
    let _ = stats;
}

fn display(p: &Path) -> String { p.to_string_lossy().to_string() }

// ───────────────────────────── Tests ─────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn quiet_vm() -> Vm { RunOptions::default().vm().with_error_sink(io::sink()) }

    fn session(input: &str) -> String {
        let mut vm = quiet_vm();
        let mut out = Vec::new();
        repl(&mut vm, Cursor::new(input), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn repl_prints_each_result() {
        let text = session("1 + 2\n\"a\" + \"b\"\n");
        assert_eq!(text, format!("{}\n> 3\n> ab\n> \n", banner()));
    }

    #[test]
    fn repl_survives_errors_and_blank_lines() {
        let text = session("-true\n\n1 +\n!nil\n");
        assert_eq!(text, format!("{}\n> > > > true\n> \n", banner()));
    }

    #[test]
    fn options_reach_the_vm() {
        let opts = RunOptions { stack_max: 3, trace_execution: true, print_code: false };
        let vm = opts.vm();
        assert_eq!(vm.config().stack_max, 3);
        assert!(vm.config().trace_execution);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run_file(Path::new("/nonexistent/script.lox"), quiet_vm(), &mut out, &mut err).unwrap();
        assert_eq!(code, exit::IOERR);
        assert!(out.is_empty());
        assert!(String::from_utf8(err).unwrap().starts_with("Could not read file \"/nonexistent/script.lox\""));
    }
}
