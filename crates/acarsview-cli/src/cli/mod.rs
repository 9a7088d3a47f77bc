pub mod replay;
pub mod summary;

pub use replay::{open_input, replay, ReplayReport};
pub use summary::{render_text, summarize, GroupSummary, StoreSummary};
