mod common;

use common::{DATA, KERNEL, Machine, get, put, put_str, syscall, va};
use lazyos::{addressing::PAGE_SIZE, task::{PFErrorCode, Task}};
use lazyos_userprog::SyscallNumber::*;

const MAP: usize = 0x1000_0000;

fn contents() -> Vec<u8> {
    (0..PAGE_SIZE + 100).map(|i| (i % 253) as u8).collect()
}

#[test]
fn mmap_then_munmap() {
    let machine = Machine::boot(&[("map.bin", &contents())]);
    let p = machine.spawn("mmap");
    let name = put_str(&p, DATA, "map.bin");
    let fd = syscall(&p, Open, &[name]) as usize;

    assert_eq!(syscall(&p, Mmap, &[MAP, 2 * PAGE_SIZE, 1, fd, 0]), MAP as isize);
    assert_eq!(machine.memfs.reads(), 0);
    // The mapping keeps its own description of the file.
    assert_eq!(syscall(&p, Close, &[fd]), 0);

    p.page_fault(PFErrorCode::USER, va(MAP + PAGE_SIZE + 4));
    assert_eq!(p.exit_status(), None);
    assert_eq!(machine.memfs.reads(), 1);
    assert_eq!(get(&p, MAP + PAGE_SIZE, 100), &contents()[PAGE_SIZE..]);
    assert!(get(&p, MAP + PAGE_SIZE + 100, 64).iter().all(|b| *b == 0));

    put(&p, MAP + 10, b"changed");
    assert_eq!(syscall(&p, Munmap, &[MAP]), 0);
    assert_eq!(&machine.memfs.contents("map.bin").unwrap()[10..17], b"changed");
    assert_eq!(machine.memfs.opens(), machine.memfs.closes());

    // The mapping is gone.
    p.page_fault(PFErrorCode::USER, va(MAP));
    assert_eq!(p.exit_status(), Some(-1));
}

#[test]
fn syscalls_read_mapped_memory() {
    let machine = Machine::boot(&[("map.bin", &contents()), ("copy", b"")]);
    let p = machine.spawn("copy");
    let name = put_str(&p, DATA, "map.bin");
    let fd = syscall(&p, Open, &[name]) as usize;
    assert_eq!(syscall(&p, Mmap, &[MAP, PAGE_SIZE + 100, 0, fd, 0]), MAP as isize);

    let copy = put_str(&p, DATA + 0x40, "copy");
    let out = syscall(&p, Open, &[copy]) as usize;
    assert_eq!(syscall(&p, Write, &[out, MAP, PAGE_SIZE + 100]), (PAGE_SIZE + 100) as isize);
    assert_eq!(machine.memfs.contents("copy").unwrap(), contents());

    // A read-only mapping cannot receive data.
    assert_eq!(syscall(&p, Seek, &[out, 0]), 0);
    syscall(&p, Read, &[out, MAP, 4]);
    assert_eq!(p.exit_status(), Some(-1));
}

#[test]
fn mmap_failures_return_zero() {
    let machine = Machine::boot(&[("map.bin", &contents()), ("empty", b"")]);
    let p = machine.spawn("mmap");
    let fd = syscall(&p, Open, &[put_str(&p, DATA, "map.bin")]) as usize;
    let empty = syscall(&p, Open, &[put_str(&p, DATA + 0x40, "empty")]) as usize;

    for args in [
        [MAP, PAGE_SIZE, 1, 0, 0],
        [MAP, PAGE_SIZE, 1, 1, 0],
        [MAP, PAGE_SIZE, 1, 9, 0],
        [MAP, 0, 1, fd, 0],
        [MAP, PAGE_SIZE, 1, empty, 0],
        [MAP + 1, PAGE_SIZE, 1, fd, 0],
        [0, PAGE_SIZE, 1, fd, 0],
        [KERNEL, PAGE_SIZE, 1, fd, 0],
        [MAP, PAGE_SIZE, 1, fd, 100],
        // Overlaps the scratch memory.
        [DATA - PAGE_SIZE, 2 * PAGE_SIZE, 1, fd, 0],
    ] {
        assert_eq!(syscall(&p, Mmap, &args), 0, "{:?}", args);
    }
    assert_eq!(p.exit_status(), None);
    // Only the two descriptors are still open.
    assert_eq!(machine.memfs.opens() - machine.memfs.closes(), 2);
}

#[test]
fn munmap_of_unknown_address_is_ignored() {
    let machine = Machine::boot(&[("map.bin", &contents())]);
    let p = machine.spawn("munmap");
    let fd = syscall(&p, Open, &[put_str(&p, DATA, "map.bin")]) as usize;
    assert_eq!(syscall(&p, Mmap, &[MAP, 2 * PAGE_SIZE, 0, fd, 0]), MAP as isize);

    assert_eq!(syscall(&p, Munmap, &[MAP + PAGE_SIZE]), 0);
    assert_eq!(syscall(&p, Munmap, &[KERNEL]), 0);
    assert_eq!(p.exit_status(), None);
    assert_eq!(get(&p, MAP + PAGE_SIZE, 4), &contents()[PAGE_SIZE..PAGE_SIZE + 4]);
}

#[test]
fn invalid_faults_terminate() {
    let machine = Machine::boot(&[("map.bin", &contents())]);

    let p = machine.spawn("segv");
    p.page_fault(PFErrorCode::USER, va(0x7000_0000));
    assert_eq!(p.exit_status(), Some(-1));

    let p = machine.spawn("ro");
    let fd = syscall(&p, Open, &[put_str(&p, DATA, "map.bin")]) as usize;
    assert_eq!(syscall(&p, Mmap, &[MAP, PAGE_SIZE, 0, fd, 0]), MAP as isize);
    p.page_fault(PFErrorCode::USER | PFErrorCode::WRITE_ACCESS, va(MAP));
    assert_eq!(p.exit_status(), Some(-1));

    let p = machine.spawn("kernel");
    p.page_fault(PFErrorCode::USER, va(KERNEL));
    assert_eq!(p.exit_status(), Some(-1));

    assert_eq!(
        machine.output(),
        "segv: exit(-1)\nro: exit(-1)\nkernel: exit(-1)\n"
    );
    assert_eq!(machine.memfs.opens(), machine.memfs.closes());
}

#[test]
fn exit_writes_back_mappings() {
    let machine = Machine::boot(&[("map.bin", &contents())]);
    let p = machine.spawn("exit");
    let fd = syscall(&p, Open, &[put_str(&p, DATA, "map.bin")]) as usize;
    assert_eq!(syscall(&p, Mmap, &[MAP, 2 * PAGE_SIZE, 1, fd, 0]), MAP as isize);
    put(&p, MAP + PAGE_SIZE, b"last words");

    syscall(&p, Exit, &[0]);
    assert_eq!(machine.output(), "exit: exit(0)\n");
    let file = machine.memfs.contents("map.bin").unwrap();
    assert_eq!(file.len(), PAGE_SIZE + 100);
    assert_eq!(&file[PAGE_SIZE..PAGE_SIZE + 10], b"last words");
    assert_eq!(machine.memfs.opens(), machine.memfs.closes());
    let frames = machine.system.frames();
    assert_eq!(frames.free_frames(), frames.capacity());
}
