use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Pager represents a physical paging device handed to a waiting patient
/// Maps to `pagers` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Pager {
    pub id: i64,
    /// Display name printed on the device
    pub name: String,
    /// Receiver number addressed by the EasyCall paging service
    pub easy_call_id: i64,
}

impl Pager {
    pub fn new(id: i64, name: impl Into<String>, easy_call_id: i64) -> Self {
        Self {
            id,
            name: name.into(),
            easy_call_id,
        }
    }
}
