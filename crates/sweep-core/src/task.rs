use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(TaskId)
            .map_err(|_| anyhow!("invalid task id: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub trashed: bool,
}

impl Task {
    pub fn new_pending(id: TaskId, text: String) -> Self {
        Self {
            id,
            text,
            done: false,
            trashed: false,
        }
    }

    pub fn with_text(&self, text: String) -> Self {
        Self {
            text,
            ..self.clone()
        }
    }

    pub fn with_done_toggled(&self) -> Self {
        Self {
            done: !self.done,
            ..self.clone()
        }
    }

    pub fn with_trashed_toggled(&self) -> Self {
        Self {
            trashed: !self.trashed,
            ..self.clone()
        }
    }
}
