//! Resolution: token extraction, partitioning, batching and the session
//! state machine that coordinates them.

pub mod tokens;
pub mod partition;
pub mod batch;
pub mod session;

pub use batch::{schedule, Batch};
pub use partition::{partition, Partition};
pub use session::{
    BatchPrompt, PendingItem, Prompt, Session, SessionOutput, SessionState, SessionSummary,
};
pub use tokens::{extract_tokens, CellLayout, ColumnTokens};
