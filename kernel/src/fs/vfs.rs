//! The handle-side interface of a device.
//!
//! Opening a device yields an [`INode`]: the object that actually serves reads, writes and control requests.
//! The namespace never looks inside it; it only hands it to a [`File`](crate::fs::file::File).

use core::any::Any;

use bitflags::bitflags;

use crate::error::{Errno, KResult};

bitflags! {
    pub struct PollFlags: u8 {
        const READ = 0b0001;
        const WRITE = 0b0010;
        const ERROR = 0b0100;
    }
}

/// The `Inode` abstraction.
/// The inode (index node) keeps information about a file in the general sense (abstraction): regular file
/// directory, special file (pipe, fifo), block device, character device, link, or anything that can be
/// abstracted as a file.
pub trait INode: Any + Sync + Send {
    /// Polls the event synchronously.
    fn poll(&self) -> KResult<PollFlags>;

    /// Returns the metadata of this INode.
    fn metadata(&self) -> KResult<INodeMetadata> {
        Err(Errno::ENOSYS)
    }

    /// Reads the file into buffer.
    fn read_buf_at(&self, offset: usize, buf: &mut [u8]) -> KResult<usize>;

    /// Writes into the file.
    fn write_buf_at(&self, offset: usize, buf: &[u8]) -> KResult<usize>;

    /// Device specific control request.
    fn ioctl(&self, _request: u64, _arg: usize) -> KResult<usize> {
        Err(Errno::ENOTTY)
    }

    /// Upper-cast to `Any`.
    fn cast_to_any(&self) -> &dyn Any;
}

/// File types.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum INodeType {
    File,
    Dir,
    SymLink,
    CharDevice,
    BlockDevice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct INodeMetadata {
    /// MAJOR | MINOR of the device holding the inode.
    pub dev_id: u64,
    /// INode id.
    pub inode_id: u64,
    /// Access rights / mode.
    pub mode: u16,
    /// Size in bytes. Zero for character devices.
    pub size: usize,
    /// MAJOR | MINOR of the device this inode represents.
    pub rdev: u64,
    /// Type.
    pub ty: INodeType,
}

/// Packs a device number the way Linux does.
pub const fn make_rdev(major: u64, minor: u64) -> u64 {
    ((major & 0xfffff000) << 32) | ((major & 0xfff) << 8) | ((minor & 0xffffff00) << 12) | (minor & 0xff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_rdev() {
        assert_eq!(make_rdev(1, 3), 0x103);
        assert_eq!(make_rdev(5, 0), 0x500);
        assert_eq!(make_rdev(0, 0x1ff), 0x1000ff);
    }
}
