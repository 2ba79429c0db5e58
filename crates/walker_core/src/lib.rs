//! Walker core: data model and the pure traversal state machine.
mod checkpoint;
mod effect;
mod model;
mod msg;
mod state;
mod update;

pub use checkpoint::{Checkpoint, ProcessedSet};
pub use effect::Effect;
pub use model::{Category, DetailItem, OutputRow, RowRead, RowSignature, TableSnapshot};
pub use msg::Msg;
pub use state::{Phase, TraversalState, TraversalStats};
pub use update::update;
