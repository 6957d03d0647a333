use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 500)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct BlockIpRequest {
    pub ip_address: String,
    #[validate(length(min = 1, max = 500, message = "Reason is required"))]
    pub reason: String,
    /// Omit for a permanent block.
    #[validate(range(min = 1, message = "Duration must be at least one hour"))]
    pub duration_hours: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SetAdminRequest {
    pub is_admin: bool,
}
