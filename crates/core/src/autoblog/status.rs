use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TriggerState {
    Idle,
    Generating { topic: String, started_at: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedPost {
    pub post_id: String,
    pub title: String,
    pub topic: String,
    pub published_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerError {
    pub message: String,
    pub at: i64,
}

/// Observable state of the auto-blog trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerStatus {
    pub state: TriggerState,
    pub last_checked_at: Option<i64>,
    pub last_published: Option<PublishedPost>,
    pub last_error: Option<TriggerError>,
}

impl Default for TriggerStatus {
    fn default() -> Self {
        Self {
            state: TriggerState::Idle,
            last_checked_at: None,
            last_published: None,
            last_error: None,
        }
    }
}

impl TriggerStatus {
    pub fn is_generating(&self) -> bool {
        matches!(self.state, TriggerState::Generating { .. })
    }
}
