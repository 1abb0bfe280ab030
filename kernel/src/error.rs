use core::result::Result;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Unix standard error codes.
///
/// The `perror` tool can be used to find the error message which is associated with a given error code.
///
/// The kernel core reports its failures with the following codes:
/// * `EINVAL`: malformed argument (bad path, bad allocator parameters, opening a directory).
/// * `EFAULT`: the object behind a handle does not exist (uninitialised devfs, destroyed number set).
/// * `ENOMEM`: the kernel heap refused an allocation.
/// * `EEXIST`: the path is already registered.
/// * `ENOENT`: the path does not resolve.
/// * `EUCLEAN`: a structural invariant is violated (path through a device, invalid number).
/// * `ENOSPC`: a number set is exhausted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum Errno {
    EPERM = 1,
    ENOENT = 2,
    ESRCH = 3,
    EINTR = 4,
    EIO = 5,
    ENXIO = 6,
    E2BIG = 7,
    ENOEXEC = 8,
    EBADF = 9,
    ECHILD = 10,
    EAGAIN = 11,
    ENOMEM = 12,
    EACCES = 13,
    EFAULT = 14,
    ENOTBLK = 15,
    EBUSY = 16,
    EEXIST = 17,
    EXDEV = 18,
    ENODEV = 19,
    ENOTDIR = 20,
    EISDIR = 21,
    EINVAL = 22,
    ENFILE = 23,
    EMFILE = 24,
    ENOTTY = 25,
    ETXTBSY = 26,
    EFBIG = 27,
    ENOSPC = 28,
    ESPIPE = 29,
    EROFS = 30,
    EMLINK = 31,
    EPIPE = 32,
    EDOM = 33,
    ERANGE = 34,
    ENAMETOOLONG = 36,
    ENOSYS = 38,
    EUCLEAN = 117,
}

impl Errno {
    /// Decodes a positive raw error number, e.g., one handed back by a C driver.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::try_from(code).ok()
    }
}

/// The return value that indicates a successful execution ([`Ok`]) or failure ([`Err`]).
///
/// In Rust, it is idiomatic to model functions that may fail as returning
/// a [`Result`]. Since in the kernel many functions return an error code,
/// [`Result`] is a type alias for a [`core::result::Result`] that uses
/// [`Errno`] as its error type.
pub type KResult<T> = Result<T, Errno>;

/// Converts from [`KResult`] to the unix-like error code represented by an [`i32`].
///
/// Useful in cases when the raw number of the error is needed. For example, a C function may want to invoke the Rust
/// FFI function but it does not recognize Rust error types.
///
/// # Examples
/// ```rust
/// use andromeda::error::{error_to_int, Errno, KResult};
///
/// let error: KResult<()> = Err(Errno::EINVAL);
/// assert_eq!(error_to_int(&error), -22);
/// ```
pub fn error_to_int<T>(result: &KResult<T>) -> i32 {
    match result.as_ref() {
        Ok(_) => 0i32,
        Err(errno) => -i32::from(*errno),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(error_to_int(&Ok::<_, Errno>(42)), 0);
        assert_eq!(error_to_int::<()>(&Err(Errno::EEXIST)), -17);
        assert_eq!(error_to_int::<()>(&Err(Errno::EUCLEAN)), -117);
    }

    #[test]
    fn test_from_code() {
        assert_eq!(Errno::from_code(2), Some(Errno::ENOENT));
        assert_eq!(Errno::from_code(28), Some(Errno::ENOSPC));
        assert_eq!(Errno::from_code(35), None);
        assert_eq!(Errno::from_code(-1), None);
    }
}
