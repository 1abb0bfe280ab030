//!  A sink like `/dev/null` is a destination for data that is discarded and not used. In programming, it's often
//! used to discard unwanted output or errors.

use core::any::Any;

use alloc::sync::Arc;

use crate::{
    error::KResult,
    fs::{
        devfs::Device,
        vfs::{make_rdev, INode, INodeMetadata, INodeType, PollFlags},
    },
};

/// The `/dev/null` device. Every open shares the same inode.
pub struct Null {
    inode: Arc<NullINode>,
}

impl Null {
    pub fn new() -> Self {
        Self {
            inode: Arc::new(NullINode),
        }
    }
}

impl Device for Null {
    fn name(&self) -> &str {
        "null"
    }

    fn open(&self) -> KResult<Arc<dyn INode>> {
        Ok(self.inode.clone())
    }
}

pub struct NullINode;

impl INode for NullINode {
    fn read_buf_at(&self, _offset: usize, _buf: &mut [u8]) -> KResult<usize> {
        Ok(0)
    }

    fn write_buf_at(&self, _offset: usize, buf: &[u8]) -> KResult<usize> {
        Ok(buf.len())
    }

    fn poll(&self) -> KResult<PollFlags> {
        Ok(PollFlags::WRITE)
    }

    fn metadata(&self) -> KResult<INodeMetadata> {
        Ok(INodeMetadata {
            dev_id: 1,
            inode_id: 3,
            mode: 0o666,
            size: 0,
            rdev: make_rdev(1, 3),
            ty: INodeType::CharDevice,
        })
    }

    fn cast_to_any(&self) -> &dyn Any {
        self
    }
}
