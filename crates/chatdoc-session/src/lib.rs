pub mod answer;
pub mod error;
pub mod service;
pub mod workspace;

pub use answer::normalize_answer;
pub use error::AskError;
pub use service::{Document, DocumentService, QueryRequest};
pub use workspace::{Answered, ChatWorkspace, Deleted, Uploaded};
