//! lox-vm : machine à pile pour le bytecode Lox
//!
//! - `Vm` : cycle de vie `new → interpret* → teardown`, pile + tas persistants entre passes
//! - `VmConfig` : capacité de pile, traces par instruction, validation des chunks
//! - `RuntimeError` : message + `[line N] in script`, la passe est abandonnée, pas le process
//!
//! ```
//! use lox_vm::{InterpretResult, Vm, VmConfig};
//! use lox_core::value::Value;
//!
//! let mut vm = Vm::new(VmConfig::default());
//! assert_eq!(vm.interpret("1 + 2"), InterpretResult::Ok(Value::Number(3.0)));
//! let stats = vm.teardown();
//! assert_eq!(stats.objects, 0);
//! ```

#![deny(missing_docs)]

/// Configuration du VM.
pub mod config;
/// Erreurs d'exécution.
pub mod error;
/// Pile d'opérandes bornée.
pub mod stack;
/// Boucle de dispatch et cycle de vie.
pub mod vm;

pub use config::{VmConfig, DEFAULT_STACK_MAX, STACK_MAX_LIMIT};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use stack::Stack;
pub use vm::{InterpretResult, Step, Vm};

/// Prélude pratique.
pub mod prelude {
    /// Réexports utiles pour une importation rapide.
    pub use super::{InterpretResult, RuntimeError, RuntimeErrorKind, Step, Vm, VmConfig};
    pub use lox_core::prelude::*;
}
