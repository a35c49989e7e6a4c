//! Out-of-band control messages.

use std::fmt;

/// Commands accepted on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCommand {
    /// Skip the waiting phase and activate now.
    ForceActivate,
    /// Evict expired entries from the API partition.
    RunEvictionSweep,
}

impl ControlCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlCommand::ForceActivate => "FORCE_ACTIVATE",
            ControlCommand::RunEvictionSweep => "RUN_EVICTION_SWEEP",
        }
    }

    /// Parse a raw control message.
    ///
    /// Accepts a bare command name or a JSON object with a `type` field.
    /// Anything unrecognized yields `None`.
    pub fn parse(message: &str) -> Option<Self> {
        let trimmed = message.trim();
        if trimmed.starts_with('{') {
            let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
            return value.get("type")?.as_str().and_then(Self::from_name);
        }
        Self::from_name(trimmed)
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "FORCE_ACTIVATE" => Some(ControlCommand::ForceActivate),
            "RUN_EVICTION_SWEEP" => Some(ControlCommand::RunEvictionSweep),
            _ => None,
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
