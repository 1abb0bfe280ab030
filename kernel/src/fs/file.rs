//! This module implementes a Unix-like file handle.
//!
//! Opening a devfs path returns a [`File`]. It pairs the [`INode`] produced by the device with the access
//! mode it was opened with and a cursor shared by every clone of the handle.

use alloc::{
    string::{String, ToString},
    sync::Arc,
};
use bitflags::bitflags;
use spin::RwLock;

use crate::{
    error::{Errno, KResult},
    fs::vfs::{INode, INodeMetadata, PollFlags},
};

bitflags! {
    pub struct FileOpenOption: u8 {
        const READ = 0b0001;
        const WRITE = 0b0010;
        const APPEND = 0b0100;
        const NON_BLOCKING = 0b1000;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOption {
    /// How the file is opened.
    pub open_option: FileOpenOption,
    /// Offset.
    pub offset: u64,
}

/// Seek direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seek {
    Start(u64),
    Cur(i64),
    End(i64),
}

/// A handle to the file object.
///
/// When a process opens a file, the kernel creates a file handle and assigns it to the process. The process can then
/// use the file handle to read from or write to the file, or to perform other operations on the file, such as seeking
/// to a specific location within the file.
#[derive(Clone)]
pub struct File {
    /// The INode `File` points to.
    inode: Arc<dyn INode>,
    /// The path the handle was opened with.
    path: String,
    /// The file option. Clones of the handle share the cursor.
    file_option: Arc<RwLock<FileOption>>,
}

impl File {
    pub fn new(inode: Arc<dyn INode>, path: &str, open_option: FileOpenOption) -> Self {
        Self {
            inode,
            path: path.to_string(),
            file_option: Arc::new(RwLock::new(FileOption {
                open_option,
                offset: 0,
            })),
        }
    }

    pub fn inode(&self) -> &Arc<dyn INode> {
        &self.inode
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn option(&self) -> FileOption {
        self.file_option.read().clone()
    }

    /// Only the non-blocking flag can be changed after the file is opened.
    pub fn set_option(&self, option: FileOpenOption) {
        let mut cur_option = self.file_option.write();
        cur_option.open_option.set(
            FileOpenOption::NON_BLOCKING,
            option.contains(FileOpenOption::NON_BLOCKING),
        );
    }

    /// Reads at the current offset and advances it.
    pub fn read_buf(&self, buf: &mut [u8]) -> KResult<usize> {
        let mut option = self.file_option.write();
        if !option.open_option.contains(FileOpenOption::READ) {
            return Err(Errno::EBADF);
        }

        let len = self.inode.read_buf_at(option.offset as usize, buf)?;
        option.offset += len as u64;
        Ok(len)
    }

    /// Writes at the current offset and advances it.
    pub fn write_buf(&self, buf: &[u8]) -> KResult<usize> {
        let mut option = self.file_option.write();
        if !option.open_option.contains(FileOpenOption::WRITE) {
            return Err(Errno::EBADF);
        }

        if option.open_option.contains(FileOpenOption::APPEND) {
            option.offset = self.size()? as u64;
        }

        let len = self.inode.write_buf_at(option.offset as usize, buf)?;
        option.offset += len as u64;
        Ok(len)
    }

    /// Reads at `offset` without touching the cursor.
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> KResult<usize> {
        if !self.file_option.read().open_option.contains(FileOpenOption::READ) {
            return Err(Errno::EBADF);
        }

        self.inode.read_buf_at(offset, buf)
    }

    /// Writes at `offset` without touching the cursor.
    pub fn write_at(&self, offset: usize, buf: &[u8]) -> KResult<usize> {
        if !self.file_option.read().open_option.contains(FileOpenOption::WRITE) {
            return Err(Errno::EBADF);
        }

        self.inode.write_buf_at(offset, buf)
    }

    /// Moves the cursor and returns the new offset.
    pub fn seek(&self, pos: Seek) -> KResult<u64> {
        let mut option = self.file_option.write();
        let offset = match pos {
            Seek::Start(offset) => Some(offset),
            Seek::Cur(delta) => option.offset.checked_add_signed(delta),
            Seek::End(delta) => (self.size()? as u64).checked_add_signed(delta),
        }
        .ok_or(Errno::EINVAL)?;

        option.offset = offset;
        Ok(offset)
    }

    pub fn ioctl(&self, request: u64, arg: usize) -> KResult<usize> {
        self.inode.ioctl(request, arg)
    }

    pub fn poll(&self) -> KResult<PollFlags> {
        self.inode.poll()
    }

    pub fn metadata(&self) -> KResult<INodeMetadata> {
        self.inode.metadata()
    }

    /// Devices without metadata are treated as unsized streams.
    fn size(&self) -> KResult<usize> {
        match self.inode.metadata() {
            Ok(metadata) => Ok(metadata.size),
            Err(Errno::ENOSYS) => Ok(0),
            Err(errno) => Err(errno),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fs::vfs::INodeType, sync::mutex::SpinLock};
    use alloc::vec::Vec;
    use core::any::Any;

    /// An in-memory inode backed by a byte vector.
    struct Buffer(SpinLock<Vec<u8>>);

    impl INode for Buffer {
        fn poll(&self) -> KResult<PollFlags> {
            Ok(PollFlags::READ | PollFlags::WRITE)
        }

        fn metadata(&self) -> KResult<INodeMetadata> {
            Ok(INodeMetadata {
                dev_id: 0,
                inode_id: 0,
                mode: 0o644,
                size: self.0.lock().len(),
                rdev: 0,
                ty: INodeType::File,
            })
        }

        fn read_buf_at(&self, offset: usize, buf: &mut [u8]) -> KResult<usize> {
            let data = self.0.lock();
            let start = offset.min(data.len());
            let len = buf.len().min(data.len() - start);
            buf[..len].copy_from_slice(&data[start..start + len]);
            Ok(len)
        }

        fn write_buf_at(&self, offset: usize, buf: &[u8]) -> KResult<usize> {
            let mut data = self.0.lock();
            if data.len() < offset + buf.len() {
                data.resize(offset + buf.len(), 0);
            }
            data[offset..offset + buf.len()].copy_from_slice(buf);
            Ok(buf.len())
        }

        fn cast_to_any(&self) -> &dyn Any {
            self
        }
    }

    fn buffer_file(option: FileOpenOption) -> File {
        File::new(Arc::new(Buffer(SpinLock::new(Vec::new()))), "/buffer", option)
    }

    #[test]
    fn test_cursor_advances() {
        let file = buffer_file(FileOpenOption::READ | FileOpenOption::WRITE);
        assert_eq!(file.write_buf(b"hello").unwrap(), 5);
        assert_eq!(file.write_buf(b" world").unwrap(), 6);
        assert_eq!(file.option().offset, 11);

        assert_eq!(file.seek(Seek::Start(6)).unwrap(), 6);
        let mut buf = [0u8; 5];
        assert_eq!(file.read_buf(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"world");
        assert_eq!(file.read_buf(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_clones_share_cursor() {
        let file = buffer_file(FileOpenOption::READ | FileOpenOption::WRITE);
        let other = file.clone();
        file.write_buf(b"abc").unwrap();
        assert_eq!(other.option().offset, 3);
    }

    #[test]
    fn test_access_mode() {
        let file = buffer_file(FileOpenOption::READ);
        assert_eq!(file.write_buf(b"x"), Err(Errno::EBADF));
        assert_eq!(file.write_at(0, b"x"), Err(Errno::EBADF));

        let file = buffer_file(FileOpenOption::WRITE);
        let mut buf = [0u8; 1];
        assert_eq!(file.read_buf(&mut buf), Err(Errno::EBADF));
        assert_eq!(file.read_at(0, &mut buf), Err(Errno::EBADF));
    }

    #[test]
    fn test_seek() {
        let file = buffer_file(FileOpenOption::READ | FileOpenOption::WRITE);
        file.write_buf(b"0123456789").unwrap();
        assert_eq!(file.seek(Seek::End(-3)).unwrap(), 7);
        assert_eq!(file.seek(Seek::Cur(-7)).unwrap(), 0);
        assert_eq!(file.seek(Seek::Cur(-1)), Err(Errno::EINVAL));
        assert_eq!(file.option().offset, 0);
    }

    #[test]
    fn test_append() {
        let file = buffer_file(FileOpenOption::READ | FileOpenOption::WRITE | FileOpenOption::APPEND);
        file.write_buf(b"ab").unwrap();
        file.seek(Seek::Start(0)).unwrap();
        file.write_buf(b"cd").unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(file.read_at(0, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn test_set_option_only_touches_non_blocking() {
        let file = buffer_file(FileOpenOption::READ);
        file.set_option(FileOpenOption::WRITE | FileOpenOption::NON_BLOCKING);
        assert_eq!(
            file.option().open_option,
            FileOpenOption::READ | FileOpenOption::NON_BLOCKING
        );
    }

    #[test]
    fn test_ioctl_default() {
        let file = buffer_file(FileOpenOption::READ);
        assert_eq!(file.ioctl(0x5401, 0), Err(Errno::ENOTTY));
    }
}
