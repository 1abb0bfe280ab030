//! Synchronization primitives for kernel threads.

pub mod mutex;
