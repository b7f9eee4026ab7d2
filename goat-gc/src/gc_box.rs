use std::cell::UnsafeCell;
use std::ops::Deref;
use std::ptr::{self, NonNull};
use std::sync::atomic::{self, AtomicU8, AtomicUsize, Ordering};

use crate::registry::Registry;

/// The neighbours of a box within its registry's list.
pub(crate) struct Links<T> {
    pub(crate) prev: *mut GcBox<T>,
    pub(crate) next: *mut GcBox<T>,
}

/// Represents a value, as it is stored within the GC.
pub struct GcBox<T> {
    /// The number of strong handles (`Gc<T>`) currently pointing to this box.
    ///
    /// Never modified for static boxes.
    strong: AtomicUsize,
    /// The GC bitflags of this box (see the `*_BITMASK` constants).
    flags: AtomicU8,
    /// Only ever read or written while holding the lock of `registry`.
    pub(crate) links: UnsafeCell<Links<T>>,
    /// The registry this box is accounted in (`None` for static boxes).
    pub(crate) registry: Option<Registry<T>>,
    pub(crate) value: T,
}

impl<T> GcBox<T> {
    /// Bitflag for whether the current GC object is marked (still referenced).
    pub const MARK_BITMASK: u8 = 0b0000_0001;
    /// Bitflag for process-lifetime objects, exempt from counting and collection.
    pub const STATIC_BITMASK: u8 = 0b0000_0010;
    /// Bitflag for whether the object is currently linked in its registry.
    pub const REGISTERED_BITMASK: u8 = 0b0000_0100;
    /// Bitflag for objects that have been torn down by a sweep.
    pub const COLLECTED_BITMASK: u8 = 0b0000_1000;

    /// Creates a dynamic `GcBox` value (which isn't part of any chain yet), with a count of 1.
    pub(crate) fn new_dynamic(value: T, registry: Registry<T>) -> Self {
        Self {
            strong: AtomicUsize::new(1),
            flags: AtomicU8::new(0),
            links: UnsafeCell::new(Links {
                prev: ptr::null_mut(),
                next: ptr::null_mut(),
            }),
            registry: Some(registry),
            value,
        }
    }

    /// Creates a static `GcBox` value.
    pub(crate) fn new_static(value: T) -> Self {
        Self {
            strong: AtomicUsize::new(1),
            flags: AtomicU8::new(Self::STATIC_BITMASK),
            links: UnsafeCell::new(Links {
                prev: ptr::null_mut(),
                next: ptr::null_mut(),
            }),
            registry: None,
            value,
        }
    }

    #[inline]
    fn has_flag(&self, mask: u8) -> bool {
        self.flags.load(Ordering::Acquire) & mask != 0
    }

    /// Returns whether counting operations on this box are no-ops.
    #[inline]
    pub fn is_static(&self) -> bool {
        self.has_flag(Self::STATIC_BITMASK)
    }

    /// Returns whether the `mark` bit is set for this GC object.
    #[inline]
    pub fn is_marked(&self) -> bool {
        self.has_flag(Self::MARK_BITMASK)
    }

    /// Sets the `mark` bit for this GC object, returning whether it was previously unset.
    #[inline]
    pub fn mark(&self) -> bool {
        self.flags.fetch_or(Self::MARK_BITMASK, Ordering::AcqRel) & Self::MARK_BITMASK == 0
    }

    /// Clears the `mark` bit for this GC object, returning whether it was previously set.
    #[inline]
    pub fn clear_mark(&self) -> bool {
        self.flags.fetch_and(!Self::MARK_BITMASK, Ordering::AcqRel) & Self::MARK_BITMASK != 0
    }

    #[inline]
    pub(crate) fn is_registered(&self) -> bool {
        self.has_flag(Self::REGISTERED_BITMASK)
    }

    #[inline]
    pub(crate) fn set_registered(&self, registered: bool) {
        if registered {
            self.flags
                .fetch_or(Self::REGISTERED_BITMASK, Ordering::AcqRel);
        } else {
            self.flags
                .fetch_and(!Self::REGISTERED_BITMASK, Ordering::AcqRel);
        }
    }

    /// Returns whether a sweep has torn this object down.
    #[inline]
    pub fn is_collected(&self) -> bool {
        self.has_flag(Self::COLLECTED_BITMASK)
    }

    #[inline]
    pub(crate) fn set_collected(&self) {
        self.flags
            .fetch_or(Self::COLLECTED_BITMASK, Ordering::AcqRel);
    }

    /// Returns the current strong count.
    #[inline]
    pub fn strong_count(&self) -> usize {
        self.strong.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn increment(&self) {
        self.strong.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the strong count, returning the new count.
    #[inline]
    pub(crate) fn decrement(&self) -> usize {
        let previous = self.strong.fetch_sub(1, Ordering::Release);
        if previous == 1 {
            atomic::fence(Ordering::Acquire);
        }
        previous - 1
    }

    /// Increments the strong count, unless it already dropped to zero.
    pub(crate) fn try_increment(&self) -> bool {
        let mut current = self.strong.load(Ordering::Relaxed);
        loop {
            if current == 0 {
                return false;
            }
            match self.strong.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Unregisters (if still linked) and frees a box whose count reached zero.
    ///
    /// # Safety
    /// `ptr` must point to a live dynamic box with no remaining strong handles.
    pub(crate) unsafe fn destroy(ptr: NonNull<GcBox<T>>) {
        if let Some(registry) = ptr.as_ref().registry.as_ref() {
            registry.remove_object(ptr);
        }
        drop(Box::from_raw(ptr.as_ptr()));
    }
}

impl<T> Deref for GcBox<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
