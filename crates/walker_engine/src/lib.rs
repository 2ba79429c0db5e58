//! Walker engine: document access, persistence and effect execution.
mod checkpoint;
mod context;
mod detail;
mod interact;
mod output;
mod paginate;
mod persist;
mod settings;
mod source;
mod table;
mod types;
mod walker;
mod webdriver;

pub use checkpoint::CheckpointStore;
pub use context::ensure_context;
pub use detail::{fetch_details, return_to_list};
pub use interact::{
    click_and_confirm, dismiss_cookie_prompt, force_and_confirm, is_interactable, safe_click,
    wait_for_clickable, wait_for_element, wait_for_presence, Backoff,
};
pub use output::OutputStore;
pub use paginate::{go_next_page, set_page_size};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use settings::{default_next_page_candidates, Timing, WalkerSettings};
pub use source::{Context, DocumentSource, ElementHandle, Frame, Locator, SourceError};
pub use table::{list_rows, read_cells, snapshot};
pub use types::{
    NullProgressSink, PageTurn, ProgressSink, SkipReason, WalkError, WalkEvent, WalkSummary,
};
pub use walker::Walker;
pub use webdriver::{WebDriverSettings, WebDriverSource};
