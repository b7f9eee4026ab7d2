//!
//! This is the runtime object model of the Goat interpreter.
//!
//! Every runtime value (strings, numbers, functions, lexical scopes, user objects)
//! lives in one object graph, whose lifetime is managed by `goat_gc`.
//!

/// Attribute keys and maps.
pub mod attributes;
/// The runtime error taxonomy.
pub mod error;
/// Built-in functions and closures.
pub mod function;
/// Debug export of object graphs.
pub mod graph;
/// The object capability root.
pub mod object;
/// Arithmetic and comparison specializations.
pub mod primitives;
/// Lexical scopes, built on top of prototypes.
pub mod scope;
/// Linearization of multiple-prototype hierarchies.
pub mod topology;
/// The runtime context of one run.
pub mod universe;
/// Facilities for manipulating values.
pub mod value;

pub use crate::error::{Error, Result};

/// A strong and owning reference to an object.
pub type ObjectRef = goat_gc::Gc<object::Object>;
/// The registry of every live dynamic object of a run.
pub type Registry = goat_gc::Registry<object::Object>;
