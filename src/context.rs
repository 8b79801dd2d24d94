use serde::{Deserialize, Serialize};

/// Identity of the caller a request runs on behalf of. Every read and write
/// is scoped to `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user_id: i64,
    pub api_id: Option<String>,
}

impl UserContext {
    pub fn new(user_id: i64) -> Self {
        Self { user_id, api_id: None }
    }

    pub fn with_api_id(mut self, api_id: impl Into<String>) -> Self {
        self.api_id = Some(api_id.into());
        self
    }
}
