#![allow(dead_code)]

use lazyos::{System, SystemConfigurationBuilder, addressing::Va};
use lazyos_vm::MmStruct;
use memfs::MemFs;
use std::sync::Arc;

pub const BASE: usize = 0x1000_0000;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn va(addr: usize) -> Va {
    Va::new(addr).unwrap()
}

/// Boots a machine with `frames` physical frames whose disk holds `files`.
pub fn boot(frames: usize, files: &[(&str, &[u8])]) -> (MemFs, Arc<System>) {
    init_logger();
    let memfs = MemFs::new();
    for (name, contents) in files {
        memfs.insert(name, contents).unwrap();
    }
    let system = SystemConfigurationBuilder::new(memfs.clone())
        .physical_frames(frames)
        .swap_slots(16)
        .build();
    (memfs, system)
}

pub fn address_space(frames: usize, files: &[(&str, &[u8])]) -> (MemFs, MmStruct) {
    let (memfs, system) = boot(frames, files);
    (memfs, MmStruct::new(system, 1))
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
