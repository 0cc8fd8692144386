//! Common relay types.

use serde::{Deserialize, Serialize};

/// Which upstream dialect a relayed request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayMode {
    /// `/v1/chat/completions` requests streaming delta chunks.
    Chat,
    /// Legacy `/v1/completions` requests streaming text chunks.
    Completion,
}

impl RelayMode {
    /// Stable name used in logs and config.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Completion => "completion",
        }
    }
}

impl std::fmt::Display for RelayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
