//! /dev/zero A zerod device.

use core::any::Any;

use alloc::sync::Arc;

use crate::{
    error::KResult,
    fs::{
        devfs::Device,
        vfs::{make_rdev, INode, INodeMetadata, INodeType, PollFlags},
    },
};

pub struct Zero;

impl Device for Zero {
    fn name(&self) -> &str {
        "zero"
    }

    fn open(&self) -> KResult<Arc<dyn INode>> {
        Ok(Arc::new(ZeroInode))
    }
}

pub struct ZeroInode;

impl INode for ZeroInode {
    fn read_buf_at(&self, _offset: usize, buf: &mut [u8]) -> KResult<usize> {
        buf.fill(0);
        Ok(buf.len())
    }

    fn write_buf_at(&self, _offset: usize, _buf: &[u8]) -> KResult<usize> {
        // Do not write to zero.
        Ok(0)
    }

    fn poll(&self) -> KResult<PollFlags> {
        Ok(PollFlags::READ)
    }

    fn metadata(&self) -> KResult<INodeMetadata> {
        Ok(INodeMetadata {
            dev_id: 1,
            inode_id: 5,
            mode: 0o666,
            size: 0,
            rdev: make_rdev(1, 5),
            ty: INodeType::CharDevice,
        })
    }

    fn cast_to_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_fills() {
        let inode = Zero.open().unwrap();
        let mut buf = [0xffu8; 16];
        assert_eq!(inode.read_buf_at(1024, &mut buf).unwrap(), 16);
        assert_eq!(buf, [0u8; 16]);
        assert_eq!(inode.write_buf_at(0, b"data").unwrap(), 0);
        assert_eq!(inode.poll().unwrap(), PollFlags::READ);
    }
}
