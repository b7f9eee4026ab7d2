use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

/// The mark phase capability.
///
/// An implementation calls `trace` on every `Gc` handle it owns.
pub trait Trace {
    fn trace(&self);
}

/// The sweep teardown capability.
///
/// Called on an unreachable value before its handles are dropped.
/// Implementations release every outgoing reference they hold, which is what breaks cycles.
pub trait Finalize {
    fn finalize(&self) {}
}

macro_rules! trivial_trace {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::trace::Trace for $ty {
                #[inline]
                fn trace(&self) {}
            }
        )*
    };
}

trivial_trace![
    (),
    bool,
    isize,
    usize,
    i32,
    u32,
    i64,
    u64,
    f64,
    char,
    String,
    str,
    Arc<str>,
];

macro_rules! iter_1_trace {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<T: $crate::trace::Trace> $crate::trace::Trace for $ty {
                #[inline]
                fn trace(&self) {
                    for it in self.iter() {
                        it.trace();
                    }
                }
            }
        )*
    };
}

iter_1_trace!(Vec<T>, VecDeque<T>, [T]);

macro_rules! iter_2_trace {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<K: $crate::trace::Trace, V: $crate::trace::Trace> $crate::trace::Trace for $ty {
                #[inline]
                fn trace(&self) {
                    for (k, v) in self.iter() {
                        k.trace();
                        v.trace();
                    }
                }
            }
        )*
    };
}

iter_2_trace!(HashMap<K, V>, IndexMap<K, V>);

impl<A: Trace, B: Trace> Trace for (A, B) {
    #[inline]
    fn trace(&self) {
        self.0.trace();
        self.1.trace();
    }
}

impl<T: Trace + ?Sized> Trace for &T {
    #[inline]
    fn trace(&self) {
        (**self).trace();
    }
}

impl<T: Trace + ?Sized> Trace for Box<T> {
    #[inline]
    fn trace(&self) {
        (**self).trace();
    }
}

impl<T: Trace> Trace for Option<T> {
    #[inline]
    fn trace(&self) {
        if let Some(value) = self {
            value.trace();
        }
    }
}

impl<T: Trace> Trace for Mutex<T> {
    #[inline]
    fn trace(&self) {
        self.lock().trace();
    }
}

impl<T: Trace> Trace for RwLock<T> {
    #[inline]
    fn trace(&self) {
        self.read().trace();
    }
}
