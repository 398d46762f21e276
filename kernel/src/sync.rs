//! SMP-supported spinlock.
//!
//! To acquire a lock on a multi-processor, a processor 1) polls a variable
//! that represents whether a value is locked or not, 2) sets the variable when
//! a thread holds the `lock`, and 3) unsets the variable when the thread
//! `unlock`s. Steps 1 and 2 are executed atomically; this module builds on the
//! [`spin`] crate for that part.
//!
//! Unlike [`std::sync::Mutex`], a [`SpinLockGuard`] is expected to be released
//! explicitly with [`SpinLockGuard::unlock`], which keeps the critical section
//! visible at the call site. Dropping the guard releases the lock as well.
//!
//! [`std::sync::Mutex`]: https://doc.rust-lang.org/std/sync/struct.Mutex.html
use core::ops::{Deref, DerefMut};

/// The lock could not be acquired at this time because the operation would
/// otherwise block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WouldBlock;

/// A mutual exclusion primitive useful for protecting shared data.
///
/// This spinlock will block threads waiting for the lock to become available.
/// The data can only be accessed through the guards returned from
/// [`lock`](Self::lock) and [`try_lock`](Self::try_lock).
///
/// # Examples
///
/// ```
/// use lazyos::sync::SpinLock;
///
/// let data = SpinLock::new(0);
/// let mut guard = data.lock();
/// *guard += 1;
/// // the lock must be "explicitly" unlocked.
/// guard.unlock();
/// assert_eq!(data.into_inner(), 1);
/// ```
pub struct SpinLock<T: ?Sized> {
    inner: spin::Mutex<T>,
}

impl<T> SpinLock<T> {
    /// Creates a new spinlock in an unlocked state ready for use.
    #[inline]
    pub const fn new(t: T) -> Self {
        Self {
            inner: spin::Mutex::new(t),
        }
    }

    /// Consumes this spinlock, returning the underlying data.
    #[inline]
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> SpinLock<T> {
    /// Acquires a spinlock, spinning the current thread until it is able to
    /// do so.
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        SpinLockGuard {
            inner: self.inner.lock(),
        }
    }

    /// Attempts to acquire this lock.
    ///
    /// If the lock could not be acquired at this time, then [`WouldBlock`] is
    /// returned. This function does not spin.
    #[inline]
    pub fn try_lock(&self) -> Result<SpinLockGuard<'_, T>, WouldBlock> {
        self.inner
            .try_lock()
            .map(|inner| SpinLockGuard { inner })
            .ok_or(WouldBlock)
    }
}

/// An implementation of a "scoped lock" of a spinlock.
///
/// The data protected by the spinlock can be accessed through this guard via
/// its [`Deref`] and [`DerefMut`] implementations.
pub struct SpinLockGuard<'a, T: ?Sized + 'a> {
    inner: spin::MutexGuard<'a, T>,
}

impl<T: ?Sized> SpinLockGuard<'_, T> {
    /// Releases the underlying [`SpinLock`].
    #[inline]
    pub fn unlock(self) {
        drop(self)
    }
}

impl<T: ?Sized> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}
