//!
//! Object lifetime management for the Goat runtime.
//!
//! Dynamic values are reference-counted through `Gc` handles and registered in a per-run
//! `Registry`, whose mark-and-sweep pass reclaims the cycles counting alone cannot.
//!

mod config;
mod gc;
mod gc_box;
mod registry;
mod trace;

pub use crate::config::{GcParams, THRESHOLD_VAR, USED_SPACE_RATIO_VAR};
pub use crate::gc::Gc;
pub use crate::gc_box::GcBox;
pub use crate::registry::{GcStats, Registry};
pub use crate::trace::{Finalize, Trace};
