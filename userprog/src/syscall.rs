//! System call infrastructure.
//!
//! On x86_64 the user program places the system call number in `%rax` and
//! up to six arguments in `%rdi`, `%rsi`, `%rdx`, `%r10`, `%r8` and `%r9`,
//! then executes `syscall`. The kernel writes the result back into `%rax`.
//!
//! ```text
//! +---------+-------+-------+-------+-------+-------+-------+
//! | sysno   | arg1  | arg2  | arg3  | arg4  | arg5  | arg6  |
//! +---------+-------+-------+-------+-------+-------+-------+
//! |  %rax   | %rdi  | %rsi  | %rdx  | %r10  | %r8   | %r9   |
//! +---------+-------+-------+-------+-------+-------+-------+
//! ```
//!
//! A failing system call returns -1 to the user; the precise
//! [`KernelError`] only reaches the kernel log.
use lazyos::{KernelError, syscall::Registers};

/// A struct representing the system call ABI (Application Binary Interface).
///
/// It stores the system call number and up to six arguments that are passed
/// to the kernel during a system call, as well as a mutable reference to the
/// CPU registers ([`Registers`]) that receive the return value.
pub struct SyscallAbi<'a> {
    /// The system call number that identifies the requested system service.
    pub sysno: usize,
    /// First argument for the system call.
    pub arg1: usize,
    /// Second argument for the system call.
    pub arg2: usize,
    /// Third argument for the system call.
    pub arg3: usize,
    /// Fourth argument for the system call.
    pub arg4: usize,
    /// Fifth argument for the system call.
    pub arg5: usize,
    /// Sixth argument for the system call.
    pub arg6: usize,
    /// The register file of the calling thread.
    pub regs: &'a mut Registers,
}

impl<'a> SyscallAbi<'a> {
    /// Constructs a [`SyscallAbi`] instance from the provided registers.
    pub fn from_registers(regs: &'a mut Registers) -> Self {
        let gprs = regs.gprs;
        Self {
            sysno: gprs.rax,
            arg1: gprs.rdi,
            arg2: gprs.rsi,
            arg3: gprs.rdx,
            arg4: gprs.r10,
            arg5: gprs.r8,
            arg6: gprs.r9,
            regs,
        }
    }

    /// Sets the return value for the system call.
    ///
    /// `Ok(value)` stores `value` in `%rax`; any error stores -1.
    pub fn set_return_value(self, return_val: Result<usize, KernelError>) {
        self.regs.gprs.rax = match return_val {
            Ok(value) => value,
            Err(e) => {
                lazyos::debug!("syscall {} failed: {:?}", self.sysno, e);
                usize::MAX
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_follow_the_calling_convention() {
        let mut regs = Registers::new();
        regs.gprs.rax = 9;
        regs.gprs.rdi = 1;
        regs.gprs.rsi = 2;
        regs.gprs.rdx = 3;
        regs.gprs.r10 = 4;
        regs.gprs.r8 = 5;
        regs.gprs.r9 = 6;
        regs.gprs.rcx = 0xdead;
        let abi = SyscallAbi::from_registers(&mut regs);
        assert_eq!(
            [abi.sysno, abi.arg1, abi.arg2, abi.arg3, abi.arg4, abi.arg5, abi.arg6],
            [9, 1, 2, 3, 4, 5, 6]
        );
        abi.set_return_value(Ok(42));
        assert_eq!(regs.gprs.rax, 42);

        let abi = SyscallAbi::from_registers(&mut regs);
        abi.set_return_value(Err(KernelError::BadFileDescriptor));
        assert_eq!(regs.gprs.rax as isize, -1);
    }
}
