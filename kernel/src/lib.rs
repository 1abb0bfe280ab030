//! The device namespace core of the Andromeda kernel.
//!
//! This crate contains the pieces of the kernel that manage shared, concurrently accessed bookkeeping:
//! * [`fs::devfs`]: the in-memory device filesystem mapping textual paths to device objects.
//! * [`fs::path`]: the path tokenizer used by every path based lookup.
//! * [`utils::numset`]: the bounded numeric resource allocator that mints unique integers.
//!
//! The crate is `no_std` and only needs `alloc`, so it links into the kernel image as-is. Unit tests run on
//! the host with `std`.

#![cfg_attr(not(test), no_std)]
#![allow(clippy::new_without_default)]

extern crate alloc;

pub mod error;
pub mod fs;
pub mod logging;
pub mod sync;
pub mod utils;

use alloc::string::String;
use lazy_static::lazy_static;

lazy_static! {
    pub static ref LOG_LEVEL: String = option_env!("OS_LOG_LEVEL").unwrap_or("info").to_lowercase();
}
