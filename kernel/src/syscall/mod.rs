//! System call infrastructure.
//!
//! A system call enters the kernel with the user's register file. The
//! system call number is in `%rax`; arguments follow the x86_64 convention
//! `%rdi, %rsi, %rdx, %r10, %r8, %r9`, and the return value goes back in
//! `%rax`.
pub mod uaccess;

/// General purpose registers of the x86_64 architecture.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct GeneralPurposeRegisters {
    pub r15: usize,
    pub r14: usize,
    pub r13: usize,
    pub r12: usize,
    pub r11: usize,
    pub r10: usize,
    pub r9: usize,
    pub r8: usize,
    pub rsi: usize,
    pub rdi: usize,
    pub rbp: usize,
    pub rdx: usize,
    pub rcx: usize,
    pub rbx: usize,
    pub rax: usize,
}

/// The register state saved on entry to the kernel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    /// General purpose registers.
    pub gprs: GeneralPurposeRegisters,
}

impl Registers {
    /// Creates a zeroed register file.
    pub fn new() -> Self {
        Self::default()
    }
}
