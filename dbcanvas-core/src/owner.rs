use serde::{Deserialize, Serialize};

/// The caller on whose behalf a canvas is duplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerContext {
    /// Identity used for quota accounting and stamped on new canvases.
    pub owner_id: String,
    /// Storage partition for the owner's canvases.
    pub owner_key: String,
    /// Per-owner canvas limit; `None` falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_limit: Option<u32>,
}

impl OwnerContext {
    pub fn new(owner_id: impl Into<String>) -> Self {
        let owner_id = owner_id.into();
        Self {
            owner_key: owner_id.clone(),
            owner_id,
            canvas_limit: None,
        }
    }

    pub fn with_owner_key(mut self, owner_key: impl Into<String>) -> Self {
        self.owner_key = owner_key.into();
        self
    }

    pub fn with_canvas_limit(mut self, limit: u32) -> Self {
        self.canvas_limit = Some(limit);
        self
    }

    pub fn effective_limit(&self, default_limit: u32) -> u32 {
        self.canvas_limit.unwrap_or(default_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_key_defaults_to_owner_id() {
        let owner = OwnerContext::new("user-1");
        assert_eq!(owner.owner_key, "user-1");
        assert_eq!(owner.effective_limit(3), 3);
        assert_eq!(owner.with_canvas_limit(10).effective_limit(3), 10);
    }
}
