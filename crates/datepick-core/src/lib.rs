//! Date picker core: per-picker state, the mutations a user or caller can
//! apply to it, and a reconciler that keeps a fixed pool of calendar nodes in
//! sync with that state. Pickers sharing an id form a date range.
//!
//! The node tree is an in-memory [`dom::Document`]; browser backends replay
//! its mutation log onto real elements.

pub mod config;
pub mod date;
pub mod dom;
pub mod error;
pub mod events;
mod mutate;
pub mod options;
pub mod pair;
pub mod picker;
pub mod registry;
pub mod render;
pub mod state;
pub mod view;

pub use date::Clock;
pub use dom::{Document, Mutation, NodeId};
pub use error::{Error, Result};
pub use events::{MonthChangeEvent, SelectEvent, Trigger, TriggerType, VisibilityEvent};
pub use options::{Options, PairId, Position, View};
pub use pair::DateRange;
pub use picker::Picker;
pub use registry::{Datepickers, DomEvent, Key, Target};
pub use state::{PickerKey, Snapshot};
