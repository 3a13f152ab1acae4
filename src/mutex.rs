//! Provides mutual exclusion for the driver's shared resources.

/// Any type that can implement `IOMutex` can be used as a mutex for synchronizing access to a
/// shared resource: the expander behind a set of register views, or the activation throttle
/// shared by every motor in the process.
///
/// The [`DefaultMutex<T>`](DefaultMutex) alias points at `std::sync::Mutex`, which has a provided
/// impl. The trait is the seam to substitute a different primitive where `std`'s mutex is not the
/// right one.
pub trait IOMutex<T> {
    /// Construct a new instance of this mutex containing the value `v`.
    fn new(v: T) -> Self;

    /// Lock the mutex and call the closure `f` as a critical section, passing a mutable reference
    /// to the owned value. Returns the value returned by `f`.
    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R;
}

pub type DefaultMutex<T> = std::sync::Mutex<T>;

impl<T> IOMutex<T> for std::sync::Mutex<T> {
    fn new(v: T) -> Self {
        std::sync::Mutex::new(v)
    }
    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        let mut v = self.lock().unwrap();
        f(&mut v)
    }
}
