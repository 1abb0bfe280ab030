//! Implementes the filesystem layer of the kernel core.
//!
//! Only the device filesystem lives here; it is rebuilt at every boot from the registrations issued by the
//! drivers, so nothing in this module touches a disk.

pub mod devfs;
pub mod file;
pub mod path;
pub mod vfs;

/// Maximum length of a single path component in bytes.
pub const MAX_NAME_LEN: usize = 255;
