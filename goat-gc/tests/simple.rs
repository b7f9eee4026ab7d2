use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use goat_gc::{Finalize, Gc, Registry, Trace};

struct Test {
    value: usize,
    drops: Arc<AtomicUsize>,
}

impl Test {
    pub fn new(value: usize, drops: &Arc<AtomicUsize>) -> Self {
        Self {
            value,
            drops: Arc::clone(drops),
        }
    }
}

impl Drop for Test {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

impl Trace for Test {
    fn trace(&self) {}
}

impl Finalize for Test {}

#[test]
fn release_to_zero_destroys_and_unregisters() {
    let registry = Registry::new();
    let drops = Arc::new(AtomicUsize::new(0));

    let a = registry.allocate(Test::new(3, &drops));
    assert_eq!(a.strong_count(), 1);
    assert_eq!(registry.live_count(), 1);

    let b = a.add_reference();
    assert_eq!(a.strong_count(), 2);
    assert!(a.ptr_eq(&b));

    b.release();
    assert_eq!(a.strong_count(), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    assert_eq!(a.value, 3);
    a.release();
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert_eq!(registry.live_count(), 0);

    let stats = registry.stats();
    assert_eq!(stats.objects_allocated, 1);
    assert_eq!(stats.objects_released, 1);
    assert_eq!(stats.objects_swept, 0);
}

#[test]
fn static_values_ignore_counting() {
    let drops = Arc::new(AtomicUsize::new(0));
    let value = Gc::new_static(Test::new(7, &drops));
    assert!(value.is_static());
    assert_eq!(value.strong_count(), 1);

    let copies: Vec<_> = (0..10).map(|_| value.add_reference()).collect();
    assert_eq!(value.strong_count(), 1);
    drop(copies);
    assert_eq!(value.strong_count(), 1);

    value.release();
    assert_eq!(drops.load(Ordering::SeqCst), 0);
}

#[test]
fn sweep_keeps_marked_objects() {
    let registry = Registry::new();
    let drops = Arc::new(AtomicUsize::new(0));

    let mut stack = Vec::new();
    stack.push(registry.allocate(Test::new(3, &drops)));
    stack.push(registry.allocate(Test::new(4, &drops)));
    stack.push(registry.allocate(Test::new(5, &drops)));

    let swept = registry.collect_garbage(|| stack.trace());
    assert_eq!(swept, 0);
    assert_eq!(registry.live_count(), 3);
    assert!(stack.iter().all(|it| !it.is_marked()));

    stack.remove(1);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert_eq!(registry.live_count(), 2);

    let swept = registry.collect_garbage(|| stack.trace());
    assert_eq!(swept, 0);
    assert_eq!(registry.stats().collections_performed, 2);
}

#[test]
fn sweep_is_authoritative_over_counts() {
    let registry = Registry::new();
    let drops = Arc::new(AtomicUsize::new(0));

    let kept = registry.allocate(Test::new(1, &drops));
    let swept = registry.sweep();
    assert_eq!(swept, 1);
    assert_eq!(registry.live_count(), 0);

    // the handle still counts, but the object is a tombstone now.
    assert!(kept.is_collected());
    assert_eq!(kept.strong_count(), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    // releasing a swept object frees it without unlinking it twice.
    kept.release();
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    let stats = registry.stats();
    assert_eq!(stats.objects_swept, 1);
    assert_eq!(stats.objects_released, 0);
}
