#![allow(dead_code)]

use lazyos::{
    System, SystemConfigurationBuilder,
    addressing::{PAGE_SIZE, Va},
    syscall::Registers,
    task::Task,
    teletype::Console,
};
use lazyos_userprog::{Process, SyscallNumber};
use lazyos_vm::VmType;
use memfs::MemFs;
use std::sync::Arc;

/// Writable scratch memory of every test process.
pub const DATA: usize = 0x4000_0000;
/// Size of the scratch memory.
pub const DATA_LEN: usize = 4 * PAGE_SIZE;
/// A read-only page of every test process.
pub const RODATA: usize = 0x5000_0000;
/// A kernel address.
pub const KERNEL: usize = 0xffff_8000_0010_0000;

pub struct Machine {
    pub memfs: MemFs,
    pub console: Arc<Console>,
    pub system: Arc<System>,
}

impl Machine {
    pub fn boot(files: &[(&str, &[u8])]) -> Self {
        Self::boot_with(files, 16, SystemConfigurationBuilder::DEFAULT_SWAP_SLOTS)
    }

    pub fn boot_with(files: &[(&str, &[u8])], frames: usize, swap_slots: usize) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let memfs = MemFs::new();
        for (name, contents) in files {
            memfs.insert(name, contents).unwrap();
        }
        let console = Arc::new(Console::new());
        let system = SystemConfigurationBuilder::new(memfs.clone())
            .physical_frames(frames)
            .swap_slots(swap_slots)
            .console(console.clone())
            .build();
        Self {
            memfs,
            console,
            system,
        }
    }

    /// Creates a process with [`DATA`] and [`RODATA`] mapped.
    pub fn spawn(&self, name: &str) -> Arc<Process> {
        let process = Arc::new(Process::new(self.system.clone(), name));
        process.with_mm(|mm| {
            mm.map_anon(va(DATA), DATA_LEN, true).unwrap();
            mm.vm_alloc_page(VmType::Anon, va(RODATA), false).unwrap();
        });
        process
    }

    pub fn output(&self) -> String {
        self.console.contents()
    }
}

pub fn va(addr: usize) -> Va {
    Va::new(addr).unwrap()
}

/// Issues a system call and returns `%rax` as the user sees it.
pub fn syscall(process: &Process, no: SyscallNumber, args: &[usize]) -> isize {
    raw_syscall(process, no as usize, args)
}

pub fn raw_syscall(process: &Process, sysno: usize, args: &[usize]) -> isize {
    let mut regs = Registers::new();
    regs.gprs.rax = sysno;
    let slots = [
        &mut regs.gprs.rdi,
        &mut regs.gprs.rsi,
        &mut regs.gprs.rdx,
        &mut regs.gprs.r10,
        &mut regs.gprs.r8,
        &mut regs.gprs.r9,
    ];
    for (slot, arg) in slots.into_iter().zip(args) {
        *slot = *arg;
    }
    process.syscall(&mut regs);
    regs.gprs.rax as isize
}

/// Places a NUL-terminated copy of `s` in user memory at `addr`.
pub fn put_str(process: &Process, addr: usize, s: &str) -> usize {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    process.copy_to_user(va(addr), &bytes).unwrap();
    addr
}

pub fn put(process: &Process, addr: usize, bytes: &[u8]) -> usize {
    process.copy_to_user(va(addr), bytes).unwrap();
    addr
}

pub fn get(process: &Process, addr: usize, len: usize) -> Vec<u8> {
    let mut buf = vec![0; len];
    process.copy_from_user(va(addr), &mut buf).unwrap();
    buf
}
