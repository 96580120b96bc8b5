//! VM configuration.
//!
//! Limits and debugging switches only; enforcement is the VM's job.

/// Operand stack capacity used by [`VmConfig::default`].
pub const DEFAULT_STACK_MAX: usize = 256;

/// Largest operand stack [`VmConfig::with_stack_max`] accepts.
pub const STACK_MAX_LIMIT: usize = 1 << 16;

/// VM configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Operand stack capacity, in slots.
    pub stack_max: usize,
    /// Emit a `trace` event per dispatched instruction (stack + disassembly).
    pub trace_execution: bool,
    /// Run `validate_chunk` on every chunk before executing it.
    pub verify_chunks: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self { stack_max: DEFAULT_STACK_MAX, trace_execution: false, verify_chunks: false }
    }
}

impl VmConfig {
    /// Default limits.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Set the operand stack capacity, capped at [`STACK_MAX_LIMIT`].
    #[must_use]
    pub const fn with_stack_max(mut self, slots: usize) -> Self {
        self.stack_max = if slots > STACK_MAX_LIMIT { STACK_MAX_LIMIT } else { slots };
        self
    }

    /// Toggle per-instruction tracing.
    #[must_use]
    pub const fn with_trace_execution(mut self, on: bool) -> Self {
        self.trace_execution = on;
        self
    }

    /// Toggle chunk validation before execution.
    #[must_use]
    pub const fn with_verify_chunks(mut self, on: bool) -> Self {
        self.verify_chunks = on;
        self
    }
}
