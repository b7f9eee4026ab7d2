use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::slice;

use goat_gc::Trace;

use crate::ObjectRef;

/// The linearization of every transitive prototype of a composite object.
///
/// Every ancestor appears exactly once, each object comes before the prototypes it derives from,
/// and ties are broken by the order in which the direct prototypes were supplied
/// (more precisely, by the depth-first discovery order starting from them).
/// Lookups walk this list and the first match wins, which gives one deterministic answer
/// for diamond hierarchies regardless of the path.
#[derive(Clone, Default)]
pub struct Topology {
    order: Vec<ObjectRef>,
}

impl Topology {
    /// Linearizes the prototype graph reachable from the given direct prototypes.
    pub fn compute(direct: &[ObjectRef]) -> Self {
        let mut nodes: Vec<ObjectRef> = Vec::new();
        let mut indices: HashMap<usize, usize> = HashMap::new();
        let mut edges: Vec<Vec<usize>> = Vec::new();

        // discover every ancestor, depth-first, in the order prototypes were supplied.
        let mut pending: Vec<ObjectRef> = direct.iter().rev().cloned().collect();
        while let Some(object) = pending.pop() {
            if indices.contains_key(&object.addr()) {
                continue;
            }
            indices.insert(object.addr(), nodes.len());
            let prototypes = object.prototypes();
            pending.extend(prototypes.iter().rev().cloned());
            nodes.push(object);
            edges.push(Vec::new());
        }

        let mut in_degrees = vec![0usize; nodes.len()];
        for (idx, node) in nodes.iter().enumerate() {
            let mut targets: Vec<usize> = node
                .prototypes()
                .iter()
                .filter_map(|prototype| indices.get(&prototype.addr()).copied())
                .collect();
            targets.dedup();
            for &target in targets.iter() {
                in_degrees[target] += 1;
            }
            edges[idx] = targets;
        }

        // Kahn's algorithm, always picking the earliest discovered ready node.
        let mut ready: BinaryHeap<Reverse<usize>> = in_degrees
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();
        let mut sorted = Vec::with_capacity(nodes.len());
        while let Some(Reverse(idx)) = ready.pop() {
            sorted.push(idx);
            for &target in edges[idx].iter() {
                in_degrees[target] -= 1;
                if in_degrees[target] == 0 {
                    ready.push(Reverse(target));
                }
            }
        }

        let order = sorted.into_iter().map(|idx| nodes[idx].clone()).collect();
        Self { order }
    }

    /// Iterate over the linearization, most specific prototype first.
    pub fn iter(&self) -> slice::Iter<'_, ObjectRef> {
        self.order.iter()
    }

    pub fn as_slice(&self) -> &[ObjectRef] {
        self.order.as_slice()
    }

    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.order.iter().any(|it| it.ptr_eq(object))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Trace for Topology {
    #[inline]
    fn trace(&self) {
        self.order.trace();
    }
}
