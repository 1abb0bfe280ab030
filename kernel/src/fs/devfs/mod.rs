//! Devfs is an alternative to "real" character and block special devices on your root filesystem. Kernel device
//! drivers can register devices by name rather than major and minor numbers. These devices will appear in devfs
//! automatically, with whatever default ownership and protection the driver specified.
//!
//! The namespace is a tree of directories whose leaves are devices. Intermediate directories are created on
//! demand by [`DevFs::register`]; nothing is ever removed. One lock covers the whole tree and is held for the
//! complete walk of every `register` and `open`, so a walk never sees a half-built branch and two drivers can
//! never race to create the same directory.

pub mod null;
pub mod random;
pub mod zero;

use alloc::{collections::BTreeMap, string::String, sync::Arc, vec::Vec};

use atomic_enum::atomic_enum;
use core::sync::atomic::Ordering;
use spin::Once;

use crate::{
    error::{Errno, KResult},
    fs::{
        file::{File, FileOpenOption},
        path::{Path, PathComponent},
        vfs::{INode, INodeType},
    },
    kdebug, kerror, kinfo,
    sync::mutex::SpinLock as Mutex,
    utils::NumSet,
};

/// The first inode number handed out; the root directory always gets it.
pub const DEVFS_INODE_BASE: i32 = 1;
/// Maximum number of nodes (root included) in one namespace.
pub const DEVFS_MAX_NODES: i32 = 0x10000;

/// A device as seen by the namespace.
///
/// The driver owns the device; the namespace only keeps a shared reference. Opening it yields the [`INode`]
/// that serves the actual I/O.
pub trait Device: Send + Sync {
    /// Name of the device, used for diagnostics.
    fn name(&self) -> &str;

    /// Opens the device.
    fn open(&self) -> KResult<Arc<dyn INode>>;
}

/// What a path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevEntry {
    pub ino: i32,
    pub ty: INodeType,
}

struct Directory {
    name: String,
    ino: i32,
    children: BTreeMap<String, DevNode>,
}

struct DeviceNode {
    name: String,
    ino: i32,
    device: Arc<dyn Device>,
}

enum DevNode {
    Directory(Directory),
    Device(DeviceNode),
}

impl Directory {
    fn new(name: &str, ino: i32) -> KResult<Self> {
        Ok(Self {
            name: copy_name(name)?,
            ino,
            children: BTreeMap::new(),
        })
    }

    /// Total number of nodes below this directory, the directory itself included.
    fn count(&self) -> usize {
        1 + self
            .children
            .values()
            .map(|child| match child {
                DevNode::Directory(dir) => dir.count(),
                DevNode::Device(_) => 1,
            })
            .sum::<usize>()
    }

    /// Follows `components` without creating anything.
    fn walk(&self, components: &[PathComponent]) -> KResult<&DevNode> {
        let (last, parents) = components.split_last().ok_or(Errno::EINVAL)?;

        let mut dir = self;
        for component in parents {
            dir = match dir.children.get(component.name()) {
                Some(DevNode::Directory(next)) => next,
                Some(DevNode::Device(device)) => {
                    kerror!("{} is a device, not a directory", device.name);
                    return Err(Errno::EUCLEAN);
                }
                None => return Err(Errno::ENOENT),
            };
        }

        dir.children.get(last.name()).ok_or(Errno::ENOENT)
    }

    /// Follows `components` as far as they exist and returns the deepest directory reached together with the
    /// components still missing below it. Never modifies the tree.
    fn deepest_mut<'a, 'p>(
        &'a mut self,
        components: &'p [PathComponent],
        path: &str,
    ) -> KResult<(&'a mut Directory, &'p [PathComponent])> {
        let mut dir = self;
        for (i, component) in components.iter().enumerate() {
            let name = component.name();
            match dir.children.get(name) {
                None => return Ok((dir, &components[i..])),
                Some(_) if i + 1 == components.len() => return Err(Errno::EEXIST),
                Some(DevNode::Device(node)) => {
                    kerror!("cannot register {}: {} is a device", path, node.name);
                    return Err(Errno::EUCLEAN);
                }
                Some(DevNode::Directory(_)) => {}
            }

            dir = match dir.children.get_mut(name) {
                Some(DevNode::Directory(next)) => next,
                _ => unreachable!(),
            };
        }

        // Only an empty path, i.e., the root, gets here.
        Err(Errno::EINVAL)
    }
}

impl DevNode {
    fn entry(&self) -> DevEntry {
        match self {
            DevNode::Directory(dir) => DevEntry {
                ino: dir.ino,
                ty: INodeType::Dir,
            },
            DevNode::Device(device) => DevEntry {
                ino: device.ino,
                ty: INodeType::CharDevice,
            },
        }
    }
}

/// One device namespace.
pub struct DevFs {
    root: Mutex<Directory>,
    inode_ids: NumSet,
}

impl DevFs {
    /// Creates an empty namespace.
    pub fn new() -> KResult<Self> {
        let inode_ids = NumSet::new(DEVFS_INODE_BASE, DEVFS_MAX_NODES, 1)?;
        let root = Directory::new("/", inode_ids.allocate()?)?;

        Ok(Self {
            root: Mutex::new(root),
            inode_ids,
        })
    }

    /// Makes `device` reachable under `path`, creating the missing directories on the way.
    ///
    /// Fails with
    /// * `EINVAL` if the path does not parse or names the root,
    /// * `EUCLEAN` if the path goes through a device,
    /// * `EEXIST` if something is already registered under `path`,
    /// * `ENOMEM`/`ENOSPC` if the node cannot be allocated.
    pub fn register(&self, path: &str, device: Arc<dyn Device>) -> KResult<()> {
        let parsed = Path::parse(path)?;

        let mut root = self.root.lock();
        let (dir, missing) = root.deepest_mut(parsed.components(), path)?;

        // The new branch is built off-tree and linked with a single insert, so a failure leaves the tree and
        // the inode numbers untouched.
        let inos = self.allocate_inos(missing.len())?;
        let (key, branch) = match build_branch(missing, &inos, device) {
            Ok(branch) => branch,
            Err(errno) => {
                self.release_inos(&inos);
                return Err(errno);
            }
        };
        kdebug!("linking {} under directory {}", key, dir.name);
        dir.children.insert(key, branch);
        kinfo!("registered device at {}", parsed);

        Ok(())
    }

    /// Takes `count` inode numbers, all or none.
    fn allocate_inos(&self, count: usize) -> KResult<Vec<i32>> {
        let mut inos = Vec::new();
        inos.try_reserve_exact(count).map_err(|_| Errno::ENOMEM)?;

        for _ in 0..count {
            match self.inode_ids.allocate() {
                Ok(ino) => inos.push(ino),
                Err(errno) => {
                    self.release_inos(&inos);
                    return Err(errno);
                }
            }
        }

        Ok(inos)
    }

    fn release_inos(&self, inos: &[i32]) {
        for &ino in inos {
            if let Err(errno) = self.inode_ids.free(ino) {
                kerror!("cannot return inode number {}: {:?}", ino, errno);
            }
        }
    }

    /// Resolves `path` and opens the device found there.
    ///
    /// Fails with `ENOENT` if the path does not resolve and `EINVAL` if it names a directory. Errors returned
    /// by the device itself are passed through.
    pub fn open(&self, path: &str, options: FileOpenOption) -> KResult<File> {
        let parsed = Path::parse(path)?;

        let device = {
            let root = self.root.lock();
            // An empty path names the root, which `walk` rejects with `EINVAL` as well.
            match root.walk(parsed.components())? {
                DevNode::Device(node) => node.device.clone(),
                DevNode::Directory(_) => return Err(Errno::EINVAL),
            }
        };

        // The node is fully linked and never removed, so the device can be opened without the lock.
        let inode = device.open()?;
        Ok(File::new(inode, path, options))
    }

    /// Resolves `path` without opening it.
    pub fn stat(&self, path: &str) -> KResult<DevEntry> {
        let parsed = Path::parse(path)?;
        let root = self.root.lock();

        if parsed.is_empty() {
            return Ok(DevEntry {
                ino: root.ino,
                ty: INodeType::Dir,
            });
        }

        root.walk(parsed.components()).map(DevNode::entry)
    }

    /// Number of nodes in the namespace, the root included.
    pub fn node_count(&self) -> usize {
        self.root.lock().count()
    }

    /// Registers the software devices every kernel has.
    pub fn register_builtin_devices(&self) -> KResult<()> {
        self.register("/null", Arc::new(null::Null::new()))?;
        self.register("/zero", Arc::new(zero::Zero))?;
        self.register("/random", Arc::new(random::Random::new(random::DEFAULT_SEED)))?;
        Ok(())
    }
}

/// Builds the chain of directories named by `missing` with the device as its leaf, bottom-up. Returns the key and
/// the node to insert into the deepest existing directory.
fn build_branch(missing: &[PathComponent], inos: &[i32], device: Arc<dyn Device>) -> KResult<(String, DevNode)> {
    let (last, parents) = missing.split_last().ok_or(Errno::EINVAL)?;
    let (&leaf_ino, dir_inos) = inos.split_last().ok_or(Errno::EINVAL)?;

    let mut key = copy_name(last.name())?;
    let mut node = DevNode::Device(DeviceNode {
        name: copy_name(last.name())?,
        ino: leaf_ino,
        device,
    });

    for (component, &ino) in parents.iter().zip(dir_inos).rev() {
        let mut dir = Directory::new(component.name(), ino)?;
        dir.children.insert(key, node);
        kdebug!("building directory {}", component.name());

        key = copy_name(component.name())?;
        node = DevNode::Directory(dir);
    }

    Ok((key, node))
}

fn copy_name(name: &str) -> KResult<String> {
    let mut copy = String::new();
    copy.try_reserve_exact(name.len()).map_err(|_| Errno::ENOMEM)?;
    copy.push_str(name);
    Ok(copy)
}

#[atomic_enum]
#[derive(PartialEq)]
enum DevfsStatus {
    Uninitialized,
    Initializing,
    Initialized,
}

static DEVFS_STATUS: AtomicDevfsStatus = AtomicDevfsStatus::new(DevfsStatus::Uninitialized);
static DEVFS: Once<DevFs> = Once::new();

/// Creates the kernel's device namespace. Must be called exactly once, before any driver registers.
///
/// # Panics
/// Panics when called a second time.
pub fn init() -> KResult<()> {
    if DEVFS_STATUS
        .compare_exchange(
            DevfsStatus::Uninitialized,
            DevfsStatus::Initializing,
            Ordering::AcqRel,
            Ordering::Acquire,
        )
        .is_err()
    {
        panic!("devfs: trying to reinitialise the device filesystem");
    }

    let fs = match create_devfs() {
        Ok(fs) => fs,
        Err(errno) => {
            DEVFS_STATUS.store(DevfsStatus::Uninitialized, Ordering::Release);
            return Err(errno);
        }
    };

    DEVFS.call_once(|| fs);
    DEVFS_STATUS.store(DevfsStatus::Initialized, Ordering::Release);
    kinfo!("device filesystem initialized");

    Ok(())
}

fn create_devfs() -> KResult<DevFs> {
    let fs = DevFs::new()?;
    #[cfg(feature = "builtin_devices")]
    fs.register_builtin_devices()?;
    Ok(fs)
}

/// Returns the kernel's device namespace. Fails with `EFAULT` before [`init`].
pub fn devfs() -> KResult<&'static DevFs> {
    DEVFS.get().ok_or(Errno::EFAULT)
}

pub fn register(path: &str, device: Arc<dyn Device>) -> KResult<()> {
    devfs()?.register(path, device)
}

pub fn open(path: &str, options: FileOpenOption) -> KResult<File> {
    devfs()?.open(path, options)
}

pub fn stat(path: &str) -> KResult<DevEntry> {
    devfs()?.stat(path)
}
