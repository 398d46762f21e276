mod common;

use common::{DATA, Machine, put, put_str, syscall};
use lazyos_userprog::SyscallNumber::*;
use std::{collections::BTreeSet, thread};

#[test]
fn threads_share_one_descriptor_table() {
    let machine = Machine::boot(&[("a.txt", b"shared")]);
    let p = machine.spawn("threads");
    let name = put_str(&p, DATA, "a.txt");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let p = p.clone();
            thread::spawn(move || {
                (0..10)
                    .map(|_| syscall(&p, Open, &[name]))
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let fds: BTreeSet<isize> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(fds, (2..42).collect::<BTreeSet<isize>>());

    // Every thread sees every descriptor.
    let p2 = p.clone();
    let size = thread::spawn(move || syscall(&p2, Filesize, &[41]))
        .join()
        .unwrap();
    assert_eq!(size, 6);
}

#[test]
fn concurrent_console_writes() {
    let machine = Machine::boot(&[]);
    let p = machine.spawn("writer");
    let line = put(&p, DATA + 0x100, b"line\n");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let p = p.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    assert_eq!(syscall(&p, Write, &[1, line, 5]), 5);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let output = machine.output();
    assert_eq!(output.lines().count(), 100);
    assert!(output.lines().all(|l| l == "line"));
}

#[test]
fn exit_from_one_thread_stops_the_others() {
    let machine = Machine::boot(&[("a.txt", b"")]);
    let p = machine.spawn("exiting");
    let name = put_str(&p, DATA, "a.txt");

    let p2 = p.clone();
    thread::spawn(move || syscall(&p2, Exit, &[5]))
        .join()
        .unwrap();
    syscall(&p, Open, &[name]);
    assert_eq!(machine.memfs.opens(), 0);
    assert_eq!(p.exit_status(), Some(5));
    assert_eq!(machine.output(), "exiting: exit(5)\n");
}
