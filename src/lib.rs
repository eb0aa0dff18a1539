pub mod config;
pub mod document;
pub mod error;
pub mod expansion;
pub mod highlight;
pub mod logging;
pub mod node;
pub mod path;
pub mod resolver;
pub mod scheduler;
pub mod search;
pub mod session;
pub mod text;
pub mod tree;
pub mod types;

pub use config::SyncConfig;
pub use document::{DocumentState, RefreshOutcome};
pub use error::{Location, ParseError, SyncError};
pub use highlight::{compute_highlighting, StyleSpan, StyleSpans, TokenClass};
pub use path::{Path, Segment};
pub use search::FilterQuery;
pub use session::{DocumentSnapshot, Navigation, Session, SessionHandle};
pub use text::{SubscriptionId, TextBuffer, TextSource};
pub use types::{NodeType, TreeNode, Validity};
