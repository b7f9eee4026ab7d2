use std::sync::Arc;
use std::thread;

use goat_gc::GcParams;
use goat_runtime::function::StdoutPrinter;
use goat_runtime::scope::Scope;
use goat_runtime::universe::Universe;
use goat_runtime::value::{Payload, Value};
use goat_runtime::Registry;

#[test]
fn closure_scope_cycles_are_swept() {
    let universe = Universe::new();
    let main = universe.create_main_scope(Arc::new(StdoutPrinter)).unwrap();

    // `f` captures the scope that binds it.
    let f = universe.create_closure(&main, Vec::new(), 0);
    main.declare(universe.key("f"), f.clone()).unwrap();
    drop(f);
    drop(main);
    assert!(universe.registry().live_count() > 0);

    let swept = universe.collect_garbage(&[]);
    assert!(swept > 0);
    assert_eq!(universe.registry().live_count(), 0);

    let stats = universe.stats();
    assert_eq!(stats.collections_performed, 1);
    assert_eq!(stats.objects_swept, swept);
}

#[test]
fn rooted_scopes_survive_collection() {
    let universe = Universe::new();
    let main = universe.create_main_scope(Arc::new(StdoutPrinter)).unwrap();

    let f = universe.create_closure(&main, vec![universe.key("x")], 0);
    main.declare(universe.key("f"), f).unwrap();
    main.declare(universe.key("name"), universe.new_string("goat"))
        .unwrap();
    let live = universe.registry().live_count();

    let garbage = universe.new_object();
    garbage
        .set_attribute(universe.key("self"), Value::from(garbage.clone()))
        .unwrap();
    drop(garbage);

    let swept = universe.collect_garbage(&[&main]);
    assert_eq!(swept, 2); // the object, and its key.
    assert_eq!(universe.registry().live_count(), live);

    let name = main.lookup(&universe.key("name")).unwrap();
    assert_eq!(name.as_str(), Some("goat"));
    assert!(main.lookup(&universe.key("print")).is_ok());
    assert!(!main.is_collected());

    // marks are cleared: a second cycle with the same roots keeps everything.
    assert_eq!(universe.collect_garbage(&[&main]), 0);
    assert_eq!(universe.registry().live_count(), live);
}

#[test]
fn swept_objects_become_tombstones() {
    let universe = Universe::new();
    let object = universe.new_object();
    object
        .set_attribute(universe.key("x"), universe.integer(1))
        .unwrap();

    // `object` is still counted, but not reachable from any root.
    universe.collect_garbage(&[]);
    assert!(object.is_collected());
    assert!(object.get_own_attribute(&universe.key("x")).is_none());
    assert!(object.prototypes().is_empty());

    let err = object
        .set_attribute(universe.key("x"), universe.integer(2))
        .unwrap_err();
    assert_eq!(err.kind_name(), "OperationNotSupported");

    // the late release only frees the memory.
    let released = universe.stats().objects_released;
    drop(object);
    assert_eq!(universe.registry().live_count(), 0);
    assert_eq!(universe.stats().objects_released, released);
}

#[test]
fn collection_triggers_past_the_threshold() {
    let registry = Registry::with_params(GcParams {
        threshold: 8,
        used_space_ratio: 0.5,
    });
    let universe = Universe::with_registry(registry);
    let root = universe.new_object();

    for idx in 0..8 {
        let garbage = universe.new_object();
        garbage
            .set_attribute(universe.key("self"), Value::from(garbage.clone()))
            .unwrap();
        root.set_attribute(universe.key("last"), universe.integer(idx))
            .unwrap();
    }
    // 8 self-referencing objects and their keys, plus the root and its key.
    assert_eq!(universe.registry().live_count(), 18);

    assert!(universe.maybe_collect_garbage(&[&root]));
    assert_eq!(universe.registry().live_count(), 2);
    assert!(!universe.maybe_collect_garbage(&[&root]));
    assert_eq!(universe.registry().params().threshold, 8);
    assert_eq!(
        root.get_own_attribute(&universe.key("last")).unwrap().payload(),
        Payload::Integer(7)
    );
}

#[test]
fn universes_run_on_many_threads() {
    let universe = Universe::new();
    let main = universe.create_main_scope(Arc::new(StdoutPrinter)).unwrap();
    let baseline = universe.registry().live_count();

    thread::scope(|s| {
        for worker in 0..4 {
            let universe = &universe;
            let main = &main;
            s.spawn(move || {
                for idx in 0..200 {
                    let block = main.clone_scope(universe);
                    block
                        .declare(universe.key("worker"), universe.integer(worker))
                        .unwrap();
                    let err = universe
                        .new_string("n = ")
                        .add(universe, &universe.integer(idx))
                        .unwrap_err();
                    assert_eq!(err.kind_name(), "IllegalArgument");

                    let inner = block.clone_scope(universe);
                    let worker_value = inner.lookup(&universe.key("worker")).unwrap();
                    assert_eq!(worker_value.payload(), Payload::Integer(worker));
                }
            });
        }
    });

    assert_eq!(universe.registry().live_count(), baseline);
    let stats = universe.stats();
    assert!(stats.objects_allocated > 4 * 200);
    assert_eq!(stats.collections_performed, 0);
}

#[test]
fn separate_universes_are_independent() {
    let handles: Vec<_> = (0..4)
        .map(|idx| {
            thread::spawn(move || {
                let universe = Universe::new();
                let main = universe.create_main_scope(Arc::new(StdoutPrinter)).unwrap();
                main.declare(universe.key("idx"), universe.integer(idx))
                    .unwrap();
                let value = main.lookup(&universe.key("idx")).unwrap();
                drop(main);
                (value.payload(), universe.registry().live_count())
            })
        })
        .collect();

    for (idx, handle) in handles.into_iter().enumerate() {
        let (payload, live) = handle.join().unwrap();
        assert_eq!(payload, Payload::Integer(idx as i64));
        assert_eq!(live, 0);
    }
}
