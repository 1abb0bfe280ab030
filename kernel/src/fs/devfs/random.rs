//! /dev/random
//! This is intended to be cryptographically secure, but this is left as future work.

use core::any::Any;

use alloc::sync::Arc;

use crate::{
    error::KResult,
    fs::{
        devfs::Device,
        vfs::{make_rdev, INode, INodeMetadata, INodeType, PollFlags},
    },
    sync::mutex::SpinLock as Mutex,
};

pub const DEFAULT_SEED: u32 = 0x2545_f491;

struct RandomInner {
    seed: u32,
}

/// Every handle opened from the same device draws from one shared generator.
#[derive(Clone)]
pub struct Random {
    inner: Arc<Mutex<RandomInner>>,
}

impl Random {
    pub fn new(seed: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RandomInner { seed })),
        }
    }
}

impl Device for Random {
    fn name(&self) -> &str {
        "random"
    }

    fn open(&self) -> KResult<Arc<dyn INode>> {
        Ok(Arc::new(self.clone()))
    }
}

impl INode for Random {
    fn read_buf_at(&self, _offset: usize, buf: &mut [u8]) -> KResult<usize> {
        let mut inner = self.inner.lock();

        // A simple linear congruential generator (LCG).
        // state = ((state * 1103515245) + 12345) & 0x7fffffff
        for byte in buf.iter_mut() {
            inner.seed = inner.seed.wrapping_mul(1103515245).wrapping_add(12345);
            *byte = ((inner.seed / 65536) % 255) as u8;
        }

        Ok(buf.len())
    }

    fn write_buf_at(&self, _offset: usize, _buf: &[u8]) -> KResult<usize> {
        Ok(0)
    }

    fn cast_to_any(&self) -> &dyn Any {
        self
    }

    fn poll(&self) -> KResult<PollFlags> {
        Ok(PollFlags::READ)
    }

    /// stat /dev/random
    fn metadata(&self) -> KResult<INodeMetadata> {
        Ok(INodeMetadata {
            dev_id: 1,
            inode_id: 8,
            mode: 0o666,
            size: 0,
            rdev: make_rdev(1, 8),
            ty: INodeType::CharDevice,
        })
    }
}
