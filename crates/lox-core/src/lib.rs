//! lox-core : primitives partagées du runtime Lox
//!
//! Fournit :
//! - `memory` : point unique d'allocation (`reallocate`) + `GrowableBuffer<T>`
//! - `value` : `Value` (nil, bool, nombre, objet)
//! - `object` : objets du tas (`StringObject`) et registre `Heap`
//! - `bytecode` : `Chunk`, `OpCode`, désassembleur, assembleur, validation
//! - `diagnostic` : `Diagnostic`, `CompileError`, type du hook `CompileFn`

#![deny(missing_docs)]

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Allocateur et buffer à croissance géométrique.
pub mod memory;
/// Valeurs du runtime.
pub mod value;
/// Objets du tas et registre.
pub mod object;
/// Primitives de bytecode (chunk, assembleur, désassembleur, helpers).
pub mod bytecode;
/// Diagnostics de compilation.
pub mod diagnostic;

/// Compatibilité : ré-exporte le désassembleur textuel.
pub use bytecode::disasm;
/// Compatibilité : ré-exporte l'assembleur minimal.
pub use bytecode::asm;

/* ─────────────────────────── Prélude (reexports utiles) ─────────────────────────── */

/// Prélude pratique pour importer les types/funcs clés du crate.
pub mod prelude {
    /// Réexports utiles pour une importation rapide.
    pub use super::{
        bytecode::{assemble, disassemble_chunk, validate_chunk, Chunk, ChunkError, OpCode},
        diagnostic::{CompileError, CompileFn, Diagnostic, Location},
        memory::GrowableBuffer,
        object::{Heap, Obj, ObjRef, ReleaseStats, StringObject},
        value::Value,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
#[cfg(test)]
mod tests {
    use super::prelude::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn assembled_listing_matches_source() {
        let mut heap = Heap::new();
        let chunk = assemble("CONSTANT \"ab\"\nCONSTANT \"cd\"\nADD\nRETURN", &mut heap)
            .expect("valid source");
        assert_eq!(validate_chunk(&chunk), Ok(()));
        assert_eq!(
            disassemble_chunk(&chunk, &heap, "concat"),
            "== concat ==\n\
             0000    1 OP_CONSTANT         0 'ab'\n\
             0002    2 OP_CONSTANT         1 'cd'\n\
             0004    3 OP_ADD\n\
             0005    4 OP_RETURN\n"
        );
        assert_eq!(heap.len(), 2);
    }
}
