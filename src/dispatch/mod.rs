//! # Call Dispatch
//!
//! The outbound paging seam. A [`CallDispatcher`] makes one pager vibrate;
//! [`EasyCallDispatcher`] does it through the EasyCall HTTP gateway.

pub mod easy_call;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Pager;

pub use easy_call::EasyCallDispatcher;

/// Failure to page a pager. Every variant rolls the patient back to `pending`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Paging gateway rejected the call with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Paging call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Paging transport error: {0}")]
    Transport(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Pages a single pager
#[async_trait]
pub trait CallDispatcher: Send + Sync {
    async fn dispatch(&self, pager: &Pager) -> DispatchResult<()>;
}
