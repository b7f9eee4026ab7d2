use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;
use std::thread::LocalKey;

use crate::gc_box::GcBox;
use crate::trace::Trace;

/// Represent a strong, counted handle to a GC-allocated value.
///
/// Cloning a handle adds a reference and dropping it releases one.
/// When the last handle to a dynamic value is released, the value is unregistered and destroyed.
/// Both operations are no-ops for static values.
#[repr(C)]
pub struct Gc<T>
where
    T: Trace + 'static,
{
    /// The pointer to the referenced `GcBox<T>`.
    pub(crate) ptr: NonNull<GcBox<T>>,
    pub(crate) marker: PhantomData<GcBox<T>>,
}

// SAFETY: the count and flags are atomics, and the registry links are only touched under its lock.
unsafe impl<T> Send for Gc<T> where T: Trace + Send + Sync + 'static {}
unsafe impl<T> Sync for Gc<T> where T: Trace + Send + Sync + 'static {}

impl<T> Gc<T>
where
    T: Trace + 'static,
{
    /// Allocates a process-lifetime value, outside of any registry.
    ///
    /// The value is never destroyed.
    pub fn new_static(value: T) -> Self {
        let allocated = Box::new(GcBox::new_static(value));
        Self::from_ptr(NonNull::from(Box::leak(allocated)))
    }

    /// Wraps a box pointer, taking over one strong count.
    #[inline]
    pub(crate) fn from_ptr(ptr: NonNull<GcBox<T>>) -> Self {
        Self {
            ptr,
            marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn inner(&self) -> &GcBox<T> {
        // SAFETY: a handle always keeps its box alive.
        unsafe { self.ptr.as_ref() }
    }

    /// Adds a strong reference, returning the new handle.
    #[inline]
    pub fn add_reference(&self) -> Self {
        self.clone()
    }

    /// Releases this strong reference.
    #[inline]
    pub fn release(self) {
        drop(self)
    }

    /// Returns the number of strong handles to this value (always 1 for static values).
    #[inline]
    pub fn strong_count(&self) -> usize {
        self.inner().strong_count()
    }

    /// Returns whether this value is exempt from both counting and collection.
    #[inline]
    pub fn is_static(&self) -> bool {
        self.inner().is_static()
    }

    /// Returns whether a sweep has already torn this value down.
    #[inline]
    pub fn is_collected(&self) -> bool {
        self.inner().is_collected()
    }

    /// Returns whether the `mark` bit is currently set for this value.
    #[inline]
    pub fn is_marked(&self) -> bool {
        self.inner().is_marked()
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        &self.inner().value as *const T
    }

    /// The identity of the referenced value.
    #[inline]
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T> fmt::Debug for Gc<T>
where
    T: fmt::Debug + Trace + 'static,
{
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt(f)
    }
}

impl<T> fmt::Display for Gc<T>
where
    T: fmt::Display + Trace + 'static,
{
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt(f)
    }
}

/// Handles compare by identity.
impl<T> PartialEq for Gc<T>
where
    T: Trace + 'static,
{
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for Gc<T> where T: Trace + 'static {}

impl<T> Hash for Gc<T>
where
    T: Trace + 'static,
{
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state)
    }
}

impl<T> AsRef<T> for Gc<T>
where
    T: Trace + 'static,
{
    #[inline]
    fn as_ref(&self) -> &T {
        &*self
    }
}

impl<T> Clone for Gc<T>
where
    T: Trace + 'static,
{
    #[inline]
    fn clone(&self) -> Self {
        let inner = self.inner();
        if !inner.is_static() {
            inner.increment();
        }
        Self::from_ptr(self.ptr)
    }
}

impl<T> Drop for Gc<T>
where
    T: Trace + 'static,
{
    fn drop(&mut self) {
        let inner = self.inner();
        if inner.is_static() || inner.decrement() != 0 {
            return;
        }
        // SAFETY: this was the last strong handle, nothing can observe the box anymore.
        unsafe { destroy_iteratively((self.ptr.cast(), destroy_erased::<T> as unsafe fn(_))) }
    }
}

impl<T> Trace for Gc<T>
where
    T: Trace + 'static,
{
    #[inline]
    fn trace(&self) {
        let inner = self.inner();
        // static values are roots on their own and only ever reference other static values.
        if inner.is_static() || !inner.mark() {
            return;
        }
        let value: &(dyn Trace + 'static) = &inner.value;
        trace_iteratively(value);
    }
}

impl<T> Deref for Gc<T>
where
    T: Trace + 'static,
{
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.inner().value
    }
}

/// A box whose count reached zero, along with the function that frees it.
type Doomed = (NonNull<u8>, unsafe fn(NonNull<u8>));

thread_local! {
    /// Values marked but not traced yet, while this thread runs a mark phase.
    static PENDING_TRACES: RefCell<Option<Vec<*const (dyn Trace + 'static)>>> = RefCell::new(None);
    /// Boxes waiting to be freed, while this thread runs a destruction cascade.
    static PENDING_DESTRUCTIONS: RefCell<Option<Vec<Doomed>>> = RefCell::new(None);
}

/// Clears a thread's work list once its outermost user is done, even when unwinding.
struct WorkListGuard<W: 'static>(&'static LocalKey<RefCell<Option<Vec<W>>>>);

impl<W: 'static> WorkListGuard<W> {
    /// Queues `work` if a work list is already being drained, returning `None` then.
    /// Otherwise, starts a new work list and returns the guard of its drain loop.
    fn enter(key: &'static LocalKey<RefCell<Option<Vec<W>>>>, work: W) -> Option<(Self, W)> {
        let mut work = Some(work);
        let started = key.try_with(|list| {
            let mut list = list.borrow_mut();
            match list.as_mut() {
                Some(pending) => {
                    pending.extend(work.take());
                    false
                }
                None => {
                    *list = Some(Vec::new());
                    true
                }
            }
        });
        match started {
            Ok(false) => None,
            // on `Err`, the thread is shutting down: `work` gets handled right away.
            _ => work.map(|work| (Self(key), work)),
        }
    }

    fn next(&self) -> Option<W> {
        self.0
            .try_with(|list| list.borrow_mut().as_mut().and_then(Vec::pop))
            .ok()
            .flatten()
    }
}

impl<W: 'static> Drop for WorkListGuard<W> {
    fn drop(&mut self) {
        let _ = self.0.try_with(|list| list.borrow_mut().take());
    }
}

/// Traces a freshly marked value, along with everything it transitively reaches.
///
/// Nested calls only queue their value, so that the native stack stays flat
/// however deep the object graph goes.
fn trace_iteratively(value: &(dyn Trace + 'static)) {
    let (guard, first) = match WorkListGuard::enter(&PENDING_TRACES, value as *const _) {
        Some(started) => started,
        None => return,
    };
    let mut next = Some(first);
    while let Some(value) = next {
        // SAFETY: queued values are marked, so they are reachable from the roots
        // held by the caller of the mark phase, and no mutator runs meanwhile.
        unsafe { (*value).trace() };
        next = guard.next();
    }
}

/// Frees a box and every box its destruction releases, one at a time.
///
/// # Safety
/// The doomed box must have no remaining strong handles.
unsafe fn destroy_iteratively(doomed: Doomed) {
    let (guard, first) = match WorkListGuard::enter(&PENDING_DESTRUCTIONS, doomed) {
        Some(started) => started,
        None => return,
    };
    let mut next = Some(first);
    while let Some((ptr, destroy)) = next {
        destroy(ptr);
        next = guard.next();
    }
}

unsafe fn destroy_erased<T>(ptr: NonNull<u8>) {
    GcBox::<T>::destroy(ptr.cast())
}
