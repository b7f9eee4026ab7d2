use std::collections::{HashMap, VecDeque};
use std::io;

use crate::value::{Payload, Value};
use crate::ObjectRef;

/// Writes the object graph reachable from `root` in the Graphviz dot format.
///
/// Attribute edges are labelled with their key, prototype edges are dashed.
/// Inline scalars are drawn as literal nodes, and static objects are drawn
/// without their attributes, only with their prototypes.
pub fn write_dot(root: &ObjectRef, w: &mut impl io::Write) -> io::Result<()> {
    let mut ids: HashMap<usize, usize> = HashMap::new();
    let mut queue: VecDeque<ObjectRef> = VecDeque::new();
    let mut literals = 0usize;

    ids.insert(root.addr(), 0);
    queue.push_back(root.clone());

    writeln!(w, "digraph objects {{")?;
    writeln!(w, "  node [shape=box];")?;
    while let Some(object) = queue.pop_front() {
        let id = ids[&object.addr()];
        let style = if object.is_static() { ", style=filled" } else { "" };
        writeln!(
            w,
            "  o{} [label=\"{}\\n{}\"{}];",
            id,
            escape(object.type_name()),
            escape(&object.to_string()),
            style,
        )?;

        for (idx, prototype) in object.prototypes().into_iter().enumerate() {
            let target = node_id(&mut ids, &mut queue, &prototype);
            writeln!(
                w,
                "  o{} -> o{} [style=dashed, label=\"{}\"];",
                id, target, idx
            )?;
        }

        if object.is_static() {
            continue;
        }
        for (key, value) in object.attributes() {
            let label = escape(&key.to_string());
            match inline_literal(&value) {
                Some(text) => {
                    writeln!(w, "  l{} [shape=plaintext, label=\"{}\"];", literals, text)?;
                    writeln!(w, "  o{} -> l{} [label=\"{}\"];", id, literals, label)?;
                    literals += 1;
                }
                None => {
                    let target = node_id(&mut ids, &mut queue, value.object());
                    writeln!(w, "  o{} -> o{} [label=\"{}\"];", id, target, label)?;
                }
            }
        }
    }
    writeln!(w, "}}")
}

fn node_id(
    ids: &mut HashMap<usize, usize>,
    queue: &mut VecDeque<ObjectRef>,
    object: &ObjectRef,
) -> usize {
    let next = ids.len();
    *ids.entry(object.addr()).or_insert_with(|| {
        queue.push_back(object.clone());
        next
    })
}

fn inline_literal(value: &Value) -> Option<String> {
    match value.payload() {
        Payload::None => None,
        Payload::Integer(_) | Payload::Real(_) => Some(escape(&value.to_string())),
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            ch => escaped.push(ch),
        }
    }
    escaped
}
