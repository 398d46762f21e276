mod common;

use common::{DATA, KERNEL, Machine, RODATA, get, put, put_str, raw_syscall, syscall, va};
use lazyos::addressing::{PAGE_SIZE, USER_TOP};
use lazyos_userprog::SyscallNumber::{self, *};
use memfs::MAX_FILE_SIZE;

#[test]
fn open_write_seek_read() {
    let machine = Machine::boot(&[("a.txt", b"")]);
    let p = machine.spawn("rw");
    let name = put_str(&p, DATA, "a.txt");

    assert_eq!(syscall(&p, Open, &[name]), 2);
    let hi = put(&p, DATA + 0x100, b"hi");
    assert_eq!(syscall(&p, Write, &[2, hi, 2]), 2);
    assert_eq!(syscall(&p, Tell, &[2]), 2);
    assert_eq!(syscall(&p, Seek, &[2, 0]), 0);
    assert_eq!(syscall(&p, Read, &[2, DATA + 0x200, 2]), 2);
    assert_eq!(get(&p, DATA + 0x200, 2), b"hi");
    assert_eq!(syscall(&p, Filesize, &[2]), 2);

    // End of file.
    assert_eq!(syscall(&p, Read, &[2, DATA + 0x200, 2]), 0);
    assert_eq!(machine.memfs.contents("a.txt").unwrap(), b"hi");
    assert_eq!(p.exit_status(), None);
}

#[test]
fn descriptors_increase() {
    let machine = Machine::boot(&[("a.txt", b"abc")]);
    let p = machine.spawn("fds");
    let name = put_str(&p, DATA, "a.txt");
    assert_eq!(syscall(&p, Open, &[name]), 2);
    assert_eq!(syscall(&p, Open, &[name]), 3);
    assert_eq!(syscall(&p, Close, &[2]), 0);
    assert_eq!(syscall(&p, Open, &[name]), 4);
    assert_eq!(syscall(&p, Filesize, &[2]), -1);
    assert_eq!(syscall(&p, Filesize, &[4]), 3);
}

#[test]
fn open_failures_return_minus_one() {
    let machine = Machine::boot(&[("a.txt", b"")]);
    let p = machine.spawn("open");
    let missing = put_str(&p, DATA, "missing");
    let long = put_str(&p, DATA + 0x40, "a-very-long-file-name");
    let empty = put_str(&p, DATA + 0x80, "");
    assert_eq!(syscall(&p, Open, &[missing]), -1);
    assert_eq!(syscall(&p, Open, &[long]), -1);
    assert_eq!(syscall(&p, Open, &[empty]), -1);
    assert_eq!(p.exit_status(), None);
}

#[test]
fn bad_pointers_terminate() {
    let machine = Machine::boot(&[("a.txt", b"data")]);
    for (no, args) in [
        (Open, vec![0]),
        (Open, vec![KERNEL]),
        (Create, vec![0, 4]),
        (Remove, vec![KERNEL]),
        (Write, vec![1, 0, 4]),
        (Write, vec![1, KERNEL, 4]),
        (Read, vec![2, 0, 4]),
        // Unmapped user memory.
        (Write, vec![1, 0x7000_0000, 4]),
        // Read into read-only memory.
        (Read, vec![2, RODATA, 4]),
        // Buffer that runs off the end of the scratch memory.
        (Read, vec![2, DATA + common::DATA_LEN - 2, 4]),
    ] {
        let p = machine.spawn("bad");
        let name = put_str(&p, DATA, "a.txt");
        assert_eq!(syscall(&p, Open, &[name]), 2);
        let reads = machine.memfs.reads();

        syscall(&p, no, &args);
        assert_eq!(p.exit_status(), Some(-1), "{:?} {:?}", no, args);
        assert_eq!(machine.memfs.reads(), reads, "{:?} {:?}", no, args);
    }
    assert!(machine.output().lines().all(|l| l == "bad: exit(-1)"));
    assert_eq!(machine.memfs.opens(), machine.memfs.closes());
    assert!(machine.memfs.contents("a.txt").unwrap() == b"data");
}

#[test]
fn check_address() {
    let machine = Machine::boot(&[]);
    let p = machine.spawn("check");
    assert!(p.check_address(0).is_err());
    assert!(p.check_address(KERNEL).is_err());
    assert!(p.check_address(0x0000_8000_0000_0000).is_err());
    assert!(p.check_address(DATA + 3).is_ok());
}

#[test]
fn unopened_descriptors() {
    let machine = Machine::boot(&[]);
    let p = machine.spawn("fds");
    assert_eq!(syscall(&p, Filesize, &[7]), -1);
    assert_eq!(syscall(&p, Tell, &[7]), -1);
    assert_eq!(syscall(&p, Seek, &[7, 3]), 0);
    assert_eq!(syscall(&p, Close, &[7]), 0);
    assert_eq!(syscall(&p, Read, &[7, DATA, 4]), -1);
    assert_eq!(syscall(&p, Write, &[7, DATA, 4]), -1);
    assert_eq!(syscall(&p, Close, &[usize::MAX]), 0);
    assert_eq!(p.exit_status(), None);
}

#[test]
fn zero_length_writes_check_the_descriptor() {
    let machine = Machine::boot(&[("a.txt", b"data")]);
    let p = machine.spawn("zero");
    assert_eq!(syscall(&p, Write, &[77, DATA, 0]), -1);
    assert_eq!(syscall(&p, Write, &[0, DATA, 0]), -1);
    assert_eq!(syscall(&p, Read, &[77, DATA, 0]), -1);
    assert_eq!(syscall(&p, Write, &[1, DATA, 0]), 0);

    let name = put_str(&p, DATA, "a.txt");
    assert_eq!(syscall(&p, Open, &[name]), 2);
    assert_eq!(syscall(&p, Write, &[2, DATA, 0]), 0);
    assert_eq!(syscall(&p, Read, &[2, DATA, 0]), 0);
    assert_eq!(syscall(&p, Tell, &[2]), 0);
    assert_eq!(machine.memfs.writes(), 0);
    assert_eq!(machine.output(), "");
    assert_eq!(p.exit_status(), None);
}

#[test]
fn extreme_positions_and_sizes() {
    let machine = Machine::boot(&[("a.txt", b"data")]);
    let p = machine.spawn("extreme");
    let name = put_str(&p, DATA, "a.txt");
    let buf = put(&p, DATA + 0x100, b"overflow");
    assert_eq!(syscall(&p, Open, &[name]), 2);

    assert_eq!(syscall(&p, Seek, &[2, usize::MAX - 1]), 0);
    assert_eq!(syscall(&p, Read, &[2, DATA + 0x200, 8]), 0);
    assert_eq!(syscall(&p, Write, &[2, buf, 8]), -1);
    assert_eq!(syscall(&p, Seek, &[2, usize::MAX]), 0);
    assert_eq!(syscall(&p, Read, &[2, DATA + 0x200, 8]), 0);

    // Far past the end, but representable.
    assert_eq!(syscall(&p, Seek, &[2, 1 << 40]), 0);
    assert_eq!(syscall(&p, Write, &[2, buf, 8]), -1);
    assert_eq!(syscall(&p, Read, &[2, DATA + 0x200, 8]), 0);
    assert_eq!(machine.memfs.contents("a.txt").unwrap(), b"data");

    let big = put_str(&p, DATA + 0x300, "big");
    assert_eq!(syscall(&p, Create, &[big, usize::MAX]), 0);
    assert_eq!(syscall(&p, Create, &[big, MAX_FILE_SIZE + 1]), 0);
    assert_eq!(syscall(&p, Open, &[big]), -1);
    assert_eq!(p.exit_status(), None);
}

#[test]
fn buffer_may_end_at_the_top_of_user_space() {
    let machine = Machine::boot(&[("a.txt", b"data")]);
    let p = machine.spawn("top");
    p.with_mm(|mm| mm.map_anon(va(USER_TOP - PAGE_SIZE), PAGE_SIZE, true))
        .unwrap();
    let last = put(&p, USER_TOP - 4, b"top
");

    assert_eq!(syscall(&p, Write, &[1, last, 4]), 4);
    assert_eq!(machine.output(), "top
");
    let name = put_str(&p, DATA, "a.txt");
    assert_eq!(syscall(&p, Open, &[name]), 2);
    assert_eq!(syscall(&p, Read, &[2, last, 4]), 4);
    assert_eq!(get(&p, last, 4), b"data");

    // One byte further is kernel memory.
    syscall(&p, Write, &[1, last, 5]);
    assert_eq!(p.exit_status(), Some(-1));
}

#[test]
fn failed_copy_out_does_not_consume_file_data() {
    // One frame and no swap: the second scratch page cannot be brought in.
    let machine = Machine::boot_with(&[("a.txt", b"abcdef")], 1, 0);
    let p = machine.spawn("nomem");
    let name = put_str(&p, DATA, "a.txt");
    assert_eq!(syscall(&p, Open, &[name]), 2);

    assert_eq!(syscall(&p, Read, &[2, DATA + PAGE_SIZE, 4]), -1);
    assert_eq!(p.exit_status(), None);
    assert_eq!(syscall(&p, Tell, &[2]), 0);
    assert_eq!(syscall(&p, Read, &[2, DATA + 0x10, 4]), 4);
    assert_eq!(get(&p, DATA + 0x10, 4), b"abcd");
    assert_eq!(syscall(&p, Tell, &[2]), 4);
}

#[test]
fn standard_streams() {
    let machine = Machine::boot(&[]);
    let p = machine.spawn("stdio");
    let msg = put(&p, DATA, b"Hello, world!\n");
    assert_eq!(syscall(&p, Write, &[1, msg, 14]), 14);
    assert_eq!(machine.output(), "Hello, world!\n");

    assert_eq!(syscall(&p, Read, &[0, DATA, 4]), -1);
    assert_eq!(syscall(&p, Write, &[0, msg, 4]), -1);
    assert_eq!(syscall(&p, Read, &[1, DATA, 4]), -1);
    assert_eq!(p.exit_status(), None);
}

#[test]
fn create_and_remove() {
    let machine = Machine::boot(&[]);
    let p = machine.spawn("files");
    let name = put_str(&p, DATA, "new");
    let long = put_str(&p, DATA + 0x40, "fifteen-chars-x");

    assert_eq!(syscall(&p, Create, &[name, 10]), 1);
    assert_eq!(syscall(&p, Create, &[name, 10]), 0);
    assert_eq!(syscall(&p, Create, &[long, 10]), 0);
    assert_eq!(syscall(&p, Open, &[name]), 2);
    assert_eq!(syscall(&p, Filesize, &[2]), 10);
    assert_eq!(syscall(&p, Remove, &[name]), 1);
    assert_eq!(syscall(&p, Remove, &[name]), 0);
    // The open file outlives its name.
    assert_eq!(syscall(&p, Read, &[2, DATA + 0x100, 10]), 10);
    assert_eq!(syscall(&p, Open, &[name]), -1);
}

#[test]
fn exit_prints_status_and_closes_files() {
    let machine = Machine::boot(&[("a.txt", b"")]);
    let p = machine.spawn("child");
    let name = put_str(&p, DATA, "a.txt");
    syscall(&p, Open, &[name]);
    syscall(&p, Open, &[name]);

    syscall(&p, Exit, &[3]);
    assert_eq!(p.exit_status(), Some(3));
    assert_eq!(machine.output(), "child: exit(3)\n");
    assert_eq!(machine.memfs.opens(), 2);
    assert_eq!(machine.memfs.closes(), 2);

    // Nothing runs after exit.
    assert_eq!(syscall(&p, Open, &[name]), SyscallNumber::Open as isize);
    assert_eq!(machine.memfs.opens(), 2);
    syscall(&p, Exit, &[4]);
    assert_eq!(machine.output(), "child: exit(3)\n");
}

#[test]
fn negative_exit_status() {
    let machine = Machine::boot(&[]);
    let p = machine.spawn("neg");
    syscall(&p, Exit, &[-7isize as usize]);
    assert_eq!(p.exit_status(), Some(-7));
    assert_eq!(machine.output(), "neg: exit(-7)\n");
}

#[test]
fn halt_powers_off() {
    let machine = Machine::boot(&[("a.txt", b"")]);
    let p = machine.spawn("halt");
    let name = put_str(&p, DATA, "a.txt");
    syscall(&p, Halt, &[]);
    assert!(machine.system.is_halted());
    syscall(&p, Open, &[name]);
    assert_eq!(machine.memfs.opens(), 0);
    assert_eq!(machine.output(), "");
}

#[test]
fn unknown_and_reserved_syscalls_terminate() {
    let machine = Machine::boot(&[]);
    for sysno in [Fork as usize, Exec as usize, Wait as usize, 16, 99, usize::MAX] {
        let p = machine.spawn("unknown");
        raw_syscall(&p, sysno, &[]);
        assert_eq!(p.exit_status(), Some(-1));
    }
    assert_eq!(machine.output().lines().count(), 6);
}
