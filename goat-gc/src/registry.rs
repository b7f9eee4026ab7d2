use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::GcParams;
use crate::gc::Gc;
use crate::gc_box::GcBox;
use crate::trace::{Finalize, Trace};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GcStats {
    /// Number of sweeps performed so far.
    pub collections_performed: usize,
    /// Number of dynamic objects ever registered.
    pub objects_allocated: usize,
    /// Number of dynamic objects destroyed because their count reached zero.
    pub objects_released: usize,
    /// Number of dynamic objects torn down by a sweep.
    pub objects_swept: usize,
    pub total_time_spent: Duration,
}

/// The doubly linked list of live dynamic objects, along with the stats it maintains.
struct RegistryState<T> {
    head: *mut GcBox<T>,
    tail: *mut GcBox<T>,
    live: usize,
    stats: GcStats,
}

// SAFETY: the list only holds pointers to boxes whose values are `Send + Sync`,
// and it is only ever accessed through its mutex.
unsafe impl<T: Send + Sync> Send for RegistryState<T> {}

impl<T> RegistryState<T> {
    /// Appends a box at the tail of the list.
    ///
    /// # Safety
    /// `ptr` must point to a live box that isn't part of any list.
    unsafe fn push_back(&mut self, ptr: NonNull<GcBox<T>>) {
        let raw = ptr.as_ptr();
        let links = &mut *ptr.as_ref().links.get();
        links.prev = self.tail;
        links.next = ptr::null_mut();
        match self.tail.as_ref() {
            Some(tail) => (*tail.links.get()).next = raw,
            None => self.head = raw,
        }
        self.tail = raw;
        self.live += 1;
    }

    /// Removes a box from the list.
    ///
    /// # Safety
    /// `ptr` must point to a live box that is part of this list.
    unsafe fn unlink(&mut self, ptr: NonNull<GcBox<T>>) {
        let links = &mut *ptr.as_ref().links.get();
        match links.prev.as_ref() {
            Some(prev) => (*prev.links.get()).next = links.next,
            None => self.head = links.next,
        }
        match links.next.as_ref() {
            Some(next) => (*next.links.get()).prev = links.prev,
            None => self.tail = links.prev,
        }
        links.prev = ptr::null_mut();
        links.next = ptr::null_mut();
        self.live -= 1;
    }
}

struct Shared<T> {
    state: Mutex<RegistryState<T>>,
    params: Mutex<GcParams>,
}

/// The per-run registry of every live dynamic object.
///
/// Allocations register themselves here, and get unlinked exactly once:
/// either when their count reaches zero, or when a sweep finds them unmarked.
/// The lock is only held for list surgery; destruction always happens outside of it.
///
/// Handles to a registry are cheap to clone and all refer to the same list.
pub struct Registry<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Registry")
            .field("live", &state.live)
            .field("stats", &state.stats)
            .finish()
    }
}

impl<T> Registry<T> {
    /// Creates a new empty registry, with the default parameters.
    pub fn new() -> Self {
        Self::with_params(GcParams::default())
    }

    /// Creates a new empty registry, with the specified parameters.
    pub fn with_params(params: GcParams) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(RegistryState {
                    head: ptr::null_mut(),
                    tail: ptr::null_mut(),
                    live: 0,
                    stats: GcStats::default(),
                }),
                params: Mutex::new(params),
            }),
        }
    }

    /// Returns a snapshot of the registry's stats.
    pub fn stats(&self) -> GcStats {
        self.shared.state.lock().stats.clone()
    }

    /// Returns a copy of the registry's parameters.
    pub fn params(&self) -> GcParams {
        self.shared.params.lock().clone()
    }

    /// Returns the number of dynamic objects currently registered.
    pub fn live_count(&self) -> usize {
        self.shared.state.lock().live
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    fn add_object(&self, ptr: NonNull<GcBox<T>>) {
        let mut state = self.shared.state.lock();
        // SAFETY: freshly allocated, not linked anywhere yet.
        unsafe { state.push_back(ptr) };
        // SAFETY: the box is alive, it was just allocated.
        unsafe { ptr.as_ref() }.set_registered(true);
        state.stats.objects_allocated += 1;
        log::trace!("registered object {:p} ({} live)", ptr.as_ptr(), state.live);
    }

    /// Unlinks a box whose count reached zero, unless a sweep already did.
    pub(crate) fn remove_object(&self, ptr: NonNull<GcBox<T>>) {
        let mut state = self.shared.state.lock();
        // SAFETY: the caller owns the last reference, so the box is still alive.
        let object = unsafe { ptr.as_ref() };
        if object.is_registered() {
            // SAFETY: registered boxes are linked in this very list.
            unsafe { state.unlink(ptr) };
            object.set_registered(false);
            state.stats.objects_released += 1;
            log::trace!("released object {:p} ({} live)", ptr.as_ptr(), state.live);
        }
    }
}

impl<T> Registry<T>
where
    T: Trace + Finalize + 'static,
{
    /// Allocates a dynamic object in this registry, returning its (only) handle.
    pub fn allocate(&self, value: T) -> Gc<T> {
        let allocated = Box::new(GcBox::new_dynamic(value, self.clone()));
        let ptr = NonNull::from(Box::leak(allocated));
        self.add_object(ptr);
        Gc::from_ptr(ptr)
    }

    /// Unlinks every unmarked object and clears the marks of the others.
    ///
    /// Returns the handles to the unlinked objects, none of which were already being released.
    fn take_unmarked(&self) -> Vec<Gc<T>> {
        let mut doomed = Vec::new();
        let mut state = self.shared.state.lock();
        let mut cursor = state.head;
        while let Some(ptr) = NonNull::new(cursor) {
            // SAFETY: linked boxes are alive until unlinked, which requires this lock.
            let object = unsafe { ptr.as_ref() };
            cursor = unsafe { (*object.links.get()).next };

            if object.clear_mark() {
                continue;
            }
            // A count of zero means a release is in flight, and it will unlink the box itself.
            if object.try_increment() {
                // SAFETY: the box is linked in this list.
                unsafe { state.unlink(ptr) };
                object.set_registered(false);
                doomed.push(Gc::from_ptr(ptr));
            }
        }
        state.stats.objects_swept += doomed.len();
        doomed
    }

    /// Performs a sweep on the registry: tears down every unmarked object.
    ///
    /// This is authoritative: unmarked objects are torn down regardless of their count.
    /// Returns the number of objects swept.
    pub fn sweep(&self) -> usize {
        let start = Instant::now();
        let swept = self.sweep_unmarked();
        self.record_collection(start.elapsed());
        swept
    }

    fn sweep_unmarked(&self) -> usize {
        let doomed = self.take_unmarked();
        for object in doomed.iter() {
            object.inner().set_collected();
        }
        for object in doomed.iter() {
            object.finalize();
        }
        let swept = doomed.len();
        // objects only kept alive by the cycles that were just broken get freed here.
        drop(doomed);
        swept
    }

    fn record_collection(&self, elapsed: Duration) {
        let mut state = self.shared.state.lock();
        state.stats.collections_performed += 1;
        state.stats.total_time_spent += elapsed;
        log::debug!(
            "collection #{} done in {:?} ({} live, {} swept so far)",
            state.stats.collections_performed,
            elapsed,
            state.live,
            state.stats.objects_swept,
        );
    }

    /// Performs garbage collection (mark-and-sweep) on the registry.
    ///
    /// `mark_fn` is the mark phase: it must call `Trace::trace` on every root.
    /// No other thread may mutate objects of this registry until this returns.
    pub fn collect_garbage(&self, mark_fn: impl FnOnce()) -> usize {
        let start = Instant::now();
        mark_fn();
        let swept = self.sweep_unmarked();
        self.record_collection(start.elapsed());
        swept
    }

    /// Performs garbage collection on the registry, only if necessary.
    ///
    /// Returns whether a collection was performed.
    pub fn maybe_collect_garbage(&self, mark_fn: impl FnOnce()) -> bool {
        let params = self.params();
        if self.live_count() <= params.threshold {
            return false;
        }

        self.collect_garbage(mark_fn);

        let live = self.live_count();
        if live as f64 > params.threshold as f64 * params.used_space_ratio {
            let threshold = (live as f64 / params.used_space_ratio) as usize;
            log::warn!(
                "collection left {} objects alive, raising threshold from {} to {}",
                live,
                params.threshold,
                threshold,
            );
            self.shared.params.lock().threshold = threshold;
        }
        true
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
