//! Reference: https://docs.rs/spin/0.5.2/spin/struct.Mutex.html

use core::cell::UnsafeCell;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

pub type SpinLock<T> = Mutex<T, Spin>;

unsafe impl<T: ?Sized + Send, S: MutexSupport> Sync for Mutex<T, S> {}
unsafe impl<T: ?Sized + Send, S: MutexSupport> Send for Mutex<T, S> {}

pub trait MutexSupport {
    /// Data held by the guard for as long as the lock is owned. It is dropped *after* the lock is released,
    /// so an implementation can restore whatever `before_lock` changed (e.g., the interrupt flag).
    type GuardData;

    /// Called before the lock is acquired.
    fn before_lock() -> Self::GuardData;

    /// When the lock is failed to acquire, we call `cpu_relax` to temporarily suspend it.
    fn cpu_relax();
}

/// The implementation of `SpinLock`.
pub struct Spin;

impl MutexSupport for Spin {
    type GuardData = ();

    #[inline]
    fn before_lock() -> Self::GuardData {}

    #[inline]
    fn cpu_relax() {
        core::hint::spin_loop();
    }
}

pub struct MutexGuard<'a, T: ?Sized + 'a, S: MutexSupport + 'a> {
    pub(super) mutex: &'a Mutex<T, S>,
    // Dropped after `Drop::drop` has released the lock.
    _guard: S::GuardData,
}

/// A generic type for mutual exclusive variable. We use the spin lock to implement it.
/// The low-level implementation is wrapped within `MutexSupport`.
pub struct Mutex<T: ?Sized, S: MutexSupport> {
    lock: AtomicBool,
    _support: PhantomData<S>,
    data: UnsafeCell<T>,
}

impl<T, S: MutexSupport> Mutex<T, S> {
    /// Creates a new spinlock wrapping the supplied data.
    ///
    /// # Example
    /// ```
    /// use andromeda::sync::mutex::SpinLock;
    ///
    /// static LOCK: SpinLock<usize> = SpinLock::new(0);
    /// *LOCK.lock() += 1;
    /// assert_eq!(*LOCK.lock(), 1);
    /// ```
    pub const fn new(user_data: T) -> Self {
        Self {
            lock: AtomicBool::new(false),
            _support: PhantomData,
            data: UnsafeCell::new(user_data),
        }
    }

    /// Consumes this mutex, returning the underlying data.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized, S: MutexSupport> Mutex<T, S> {
    /// Spins until the lock is acquired.
    ///
    /// The lock is released when the returned guard falls out of scope.
    pub fn lock(&self) -> MutexGuard<'_, T, S> {
        let guard = S::before_lock();
        // Test-and-test-and-set: only retry the atomic write once the lock looks free.
        while self
            .lock
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.lock.load(Ordering::Relaxed) {
                S::cpu_relax();
            }
        }

        MutexGuard {
            mutex: self,
            _guard: guard,
        }
    }

    /// Tries to lock the mutex once. Returns `None` if it is already held.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T, S>> {
        let guard = S::before_lock();
        self.lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| MutexGuard {
                mutex: self,
                _guard: guard,
            })
    }

    pub fn is_locked(&self) -> bool {
        self.lock.load(Ordering::Relaxed)
    }

    /// Returns a mutable reference to the underlying data. No locking is needed because we have `&mut self`.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T: Default, S: MutexSupport> Default for Mutex<T, S> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized + fmt::Debug, S: MutexSupport> fmt::Debug for Mutex<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock() {
            Some(guard) => write!(f, "Mutex {{ data: {:?} }}", &*guard),
            None => write!(f, "Mutex {{ <locked> }}"),
        }
    }
}

impl<'a, T: ?Sized, S: MutexSupport> Deref for MutexGuard<'a, T, S> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T: ?Sized, S: MutexSupport> DerefMut for MutexGuard<'a, T, S> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<'a, T: ?Sized, S: MutexSupport> Drop for MutexGuard<'a, T, S> {
    fn drop(&mut self) {
        self.mutex.lock.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use std::thread;

    #[test]
    fn test_try_lock() {
        let lock = SpinLock::new(0u32);
        let guard = lock.lock();
        assert!(lock.is_locked());
        assert!(lock.try_lock().is_none());
        drop(guard);
        assert!(!lock.is_locked());
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn test_mutual_exclusion() {
        let counter = Arc::new(SpinLock::new(0usize));
        let handles = (0..8)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        *counter.lock() += 1;
                    }
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*counter.lock(), 8000);
    }

    #[test]
    fn test_into_inner() {
        let mut lock = SpinLock::new(alloc::vec![1, 2]);
        lock.get_mut().push(3);
        assert_eq!(lock.into_inner(), alloc::vec![1, 2, 3]);
    }
}
