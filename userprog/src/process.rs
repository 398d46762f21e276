//! A user process.
//!
//! A [`Process`] is shared by all threads of the process. Its file
//! descriptor table and its address space each sit behind their own
//! spinlock; when both are needed, the file descriptor table is locked
//! first.
use crate::{
    SyscallNumber,
    file_struct::{FileDescriptor, FileStruct},
    syscall::SyscallAbi,
};
use alloc::{format, string::String, sync::Arc, vec};
use core::ops::Range;
use lazyos::{
    KernelError, System,
    addressing::Va,
    fs::File,
    sync::SpinLock,
    syscall::{
        Registers,
        uaccess::{UserCString, UserU8SliceRO, UserU8SliceWO},
    },
    task::{PFErrorCode, Task},
};
use lazyos_vm::{MmStruct, Pid, fault::PageFaultReason};

/// A user process.
pub struct Process {
    name: String,
    pid: Pid,
    system: Arc<System>,
    file_struct: SpinLock<FileStruct>,
    mm_struct: SpinLock<MmStruct>,
    exit_status: SpinLock<Option<i32>>,
}

impl Process {
    /// Creates a process called `name` with an empty address space and no
    /// open file.
    pub fn new(system: Arc<System>, name: &str) -> Self {
        let pid = system.allocate_pid();
        Self {
            name: String::from(name),
            pid,
            file_struct: SpinLock::new(FileStruct::new()),
            mm_struct: SpinLock::new(MmStruct::new(system.clone(), pid)),
            exit_status: SpinLock::new(None),
            system,
        }
    }

    /// The name of the process.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The process identifier.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// The exit status, once the process has exited.
    pub fn exit_status(&self) -> Option<i32> {
        let status = self.exit_status.lock();
        let v = *status;
        status.unlock();
        v
    }

    /// Returns `true` once the process has exited.
    pub fn has_exited(&self) -> bool {
        self.exit_status().is_some()
    }

    /// Runs `f` on the address space of the process.
    ///
    /// This is how a loader lays out the memory of the program.
    pub fn with_mm<R>(&self, f: impl FnOnce(&mut MmStruct) -> R) -> R {
        let mut mm = self.mm_struct.lock();
        let r = f(&mut *mm);
        mm.unlock();
        r
    }

    /// Runs `f` on the file descriptor table of the process.
    pub fn with_files<R>(&self, f: impl FnOnce(&mut FileStruct) -> R) -> R {
        let mut files = self.file_struct.lock();
        let r = f(&mut *files);
        files.unlock();
        r
    }

    /// Terminates the process with `status`.
    ///
    /// Prints `"{name}: exit({status})"` to the console, closes every open
    /// file and tears the address space down. Only the first call has an
    /// effect.
    pub fn exit(&self, status: i32) {
        let mut exit_status = self.exit_status.lock();
        if exit_status.is_some() {
            exit_status.unlock();
            return;
        }
        *exit_status = Some(status);
        exit_status.unlock();

        let message = format!("{}: exit({})\n", self.name, status);
        if let Err(e) = self.system.console().write(message.as_bytes()) {
            lazyos::warning!("cannot print the exit message: {:?}", e);
        }
        lazyos::info!("{} (pid {}) exited with {}", self.name, self.pid, status);

        self.with_files(FileStruct::close_all);
        self.with_mm(MmStruct::exit_mmap);
    }

    /// Validates a user pointer.
    ///
    /// # Returns
    /// - `Ok(Va)`: `addr` is a non-null user address.
    /// - `Err(KernelError::BadAddress)`: Otherwise. The system call layer
    ///   terminates the process on this error.
    pub fn check_address(&self, addr: usize) -> Result<Va, KernelError> {
        match Va::new(addr) {
            Some(va) if !va.is_null() && va.is_user() => Ok(va),
            _ => Err(KernelError::BadAddress),
        }
    }

    /// Validates a user buffer of `len` bytes at `addr` before it is used.
    fn check_buffer(&self, addr: usize, len: usize, is_write: bool) -> Result<(), KernelError> {
        let start = self.check_address(addr)?;
        let end = addr
            .checked_add(len)
            .and_then(Va::user_end)
            .ok_or(KernelError::BadAddress)?;
        if len != 0 && !self.access_ok(start..end, is_write) {
            return Err(KernelError::BadAddress);
        }
        Ok(())
    }

    fn halt(&self) -> Result<usize, KernelError> {
        self.system.power_off();
        Ok(0)
    }

    fn exit_syscall(&self, abi: &SyscallAbi) -> Result<usize, KernelError> {
        self.exit(abi.arg1 as i32);
        Ok(0)
    }

    fn create(&self, abi: &SyscallAbi) -> Result<usize, KernelError> {
        self.check_address(abi.arg1)?;
        let name = UserCString::new(abi.arg1).read(self)?;
        Ok(self
            .system
            .file_system()
            .create(&name, abi.arg2)
            .map_or(0, |_| 1))
    }

    fn remove(&self, abi: &SyscallAbi) -> Result<usize, KernelError> {
        self.check_address(abi.arg1)?;
        let name = UserCString::new(abi.arg1).read(self)?;
        Ok(self.system.file_system().remove(&name).map_or(0, |_| 1))
    }

    fn open(&self, abi: &SyscallAbi) -> Result<usize, KernelError> {
        self.check_address(abi.arg1)?;
        let name = UserCString::new(abi.arg1).read(self)?;
        let fs = self.system.file_system();
        let fd = self.with_files(|files| files.open(fs, &name))?;
        Ok(fd.0 as usize)
    }

    fn filesize(&self, abi: &SyscallAbi) -> Result<usize, KernelError> {
        let fd = FileDescriptor::from_arg(abi.arg1);
        self.with_files(|files| files.filesize(fd))
    }

    fn read(&self, abi: &SyscallAbi) -> Result<usize, KernelError> {
        let fd = FileDescriptor::from_arg(abi.arg1);
        self.check_buffer(abi.arg2, abi.arg3, true)?;
        match fd {
            FileDescriptor::STDIN => Err(KernelError::NotSupportedOperation),
            FileDescriptor::STDOUT => Err(KernelError::BadFileDescriptor),
            fd => {
                let mut buf = vec![0u8; abi.arg3];
                let (position, read) = self.with_files(|files| {
                    let position = files.tell(fd)?;
                    files.read(fd, &mut buf).map(|read| (position, read))
                })?;
                if read == 0 {
                    return Ok(0);
                }
                // Bytes that never reach the user are not consumed.
                UserU8SliceWO::new(abi.arg2, read)
                    .put(self, &buf[..read])
                    .inspect_err(|_| self.with_files(|files| files.seek(fd, position)))
            }
        }
    }

    fn write(&self, abi: &SyscallAbi) -> Result<usize, KernelError> {
        let fd = FileDescriptor::from_arg(abi.arg1);
        self.check_buffer(abi.arg2, abi.arg3, false)?;
        match fd {
            FileDescriptor::STDIN => Err(KernelError::BadFileDescriptor),
            FileDescriptor::STDOUT => {
                if abi.arg3 == 0 {
                    return Ok(0);
                }
                let data = UserU8SliceRO::new(abi.arg2, abi.arg3).get(self)?;
                self.system.console().write(&data)?;
                Ok(abi.arg3)
            }
            fd => {
                self.with_files(|files| files.get(fd).map(|_| ()))?;
                if abi.arg3 == 0 {
                    return Ok(0);
                }
                let data = UserU8SliceRO::new(abi.arg2, abi.arg3).get(self)?;
                self.with_files(|files| files.write(fd, &data))
            }
        }
    }

    fn seek(&self, abi: &SyscallAbi) -> Result<usize, KernelError> {
        let fd = FileDescriptor::from_arg(abi.arg1);
        self.with_files(|files| files.seek(fd, abi.arg2));
        Ok(0)
    }

    fn tell(&self, abi: &SyscallAbi) -> Result<usize, KernelError> {
        let fd = FileDescriptor::from_arg(abi.arg1);
        self.with_files(|files| files.tell(fd))
    }

    fn close(&self, abi: &SyscallAbi) -> Result<usize, KernelError> {
        let fd = FileDescriptor::from_arg(abi.arg1);
        self.with_files(|files| files.close(fd));
        Ok(0)
    }

    /// `mmap(addr, length, writable, fd, offset)`.
    ///
    /// Returns `addr`, or 0 if the file cannot be mapped there.
    fn mmap(&self, abi: &SyscallAbi) -> Result<usize, KernelError> {
        let (addr, length, writable) = (abi.arg1, abi.arg2, abi.arg3 != 0);
        let fd = FileDescriptor::from_arg(abi.arg4);
        let offset = abi.arg5;
        if fd.is_stdio() || length == 0 {
            return Ok(0);
        }
        let Some(addr) = Va::new(addr) else {
            return Ok(0);
        };
        let file: File = match self.with_files(|files| files.get(fd)?.reopen()) {
            Ok(file) if file.length() != 0 => file,
            Ok(_) | Err(_) => return Ok(0),
        };
        match self.with_mm(|mm| mm.do_mmap(addr, length, writable, file, offset)) {
            Ok(addr) => Ok(addr.into_usize()),
            Err(e) => {
                lazyos::debug!("mmap at {:?} failed: {:?}", addr, e);
                Ok(0)
            }
        }
    }

    fn munmap(&self, abi: &SyscallAbi) -> Result<usize, KernelError> {
        let result = match Va::new(abi.arg1) {
            Some(addr) => self.with_mm(|mm| mm.do_munmap(addr)),
            None => Err(KernelError::InvalidArgument),
        };
        if let Err(e) = result {
            lazyos::warning!("munmap({:#x}) failed: {:?}", abi.arg1, e);
        }
        Ok(0)
    }
}

impl Task for Process {
    /// Handles a system call request from a user program.
    ///
    /// The system call number and its arguments are extracted with
    /// [`SyscallAbi::from_registers`] and dispatched on [`SyscallNumber`].
    /// A handler that meets an invalid user pointer, and any unknown or
    /// reserved number, terminates the process with status -1. Otherwise the
    /// result is stored with [`SyscallAbi::set_return_value`].
    fn syscall(&self, regs: &mut Registers) {
        if self.has_exited() || self.system.is_halted() {
            return;
        }
        let abi = SyscallAbi::from_registers(regs);
        let return_val = SyscallNumber::try_from(abi.sysno)
            .map_err(|_| KernelError::NoSuchSyscall)
            .and_then(|no| match no {
                SyscallNumber::Halt => self.halt(),
                SyscallNumber::Exit => self.exit_syscall(&abi),
                SyscallNumber::Create => self.create(&abi),
                SyscallNumber::Remove => self.remove(&abi),
                SyscallNumber::Open => self.open(&abi),
                SyscallNumber::Filesize => self.filesize(&abi),
                SyscallNumber::Read => self.read(&abi),
                SyscallNumber::Write => self.write(&abi),
                SyscallNumber::Seek => self.seek(&abi),
                SyscallNumber::Tell => self.tell(&abi),
                SyscallNumber::Close => self.close(&abi),
                SyscallNumber::Mmap => self.mmap(&abi),
                SyscallNumber::Munmap => self.munmap(&abi),
                SyscallNumber::Fork | SyscallNumber::Exec | SyscallNumber::Wait => {
                    Err(KernelError::NoSuchSyscall)
                }
            });
        match return_val {
            Err(KernelError::NoSuchSyscall) => {
                lazyos::warning!("Unknown system call {} from {}", abi.sysno, self.name);
                self.exit(-1);
            }
            Err(KernelError::BadAddress) => {
                lazyos::debug!("{} passed a bad address to syscall {}", self.name, abi.sysno);
                self.exit(-1);
            }
            _ if self.has_exited() || self.system.is_halted() => {}
            r => abi.set_return_value(r),
        }
    }

    /// Resolves a page fault, or terminates the process with status -1 if
    /// the access is invalid.
    fn page_fault(&self, ec: PFErrorCode, cr2: Va) {
        let reason = PageFaultReason::new(ec, cr2);
        if let Err(e) = self.with_mm(|mm| mm.handle_page_fault(&reason)) {
            lazyos::debug!("{} faulted at {:?}: {:?}", self.name, cr2, e);
            self.exit(-1);
        }
    }

    fn access_ok(&self, addr: Range<Va>, is_write: bool) -> bool {
        self.with_mm(|mm| mm.access_ok(addr, is_write))
    }

    fn copy_from_user(&self, addr: Va, buf: &mut [u8]) -> Result<(), KernelError> {
        self.with_mm(|mm| mm.copy_from_user(addr, buf))
    }

    fn copy_to_user(&self, addr: Va, buf: &[u8]) -> Result<(), KernelError> {
        self.with_mm(|mm| mm.copy_to_user(addr, buf))
    }
}
