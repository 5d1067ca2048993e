//! ---
//! agrotel_section: "11-simulation"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Device command acknowledgements."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use agrotel_common::epoch_millis;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Free-form command arguments keyed by name.
pub type CommandParameters = BTreeMap<String, JsonValue>;

/// Message attached to every simulated acknowledgement.
pub const COMMAND_ACK_MESSAGE: &str = "Command executed successfully";

/// Acknowledgement returned once a simulated device command completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandAck {
    pub device_id: String,
    pub command: String,
    #[serde(default)]
    pub parameters: CommandParameters,
    /// Milliseconds since the Unix epoch at completion.
    pub timestamp: i64,
    pub success: bool,
    pub message: String,
}

impl CommandAck {
    pub fn succeeded(device_id: &str, command: &str, parameters: CommandParameters) -> Self {
        Self {
            device_id: device_id.to_owned(),
            command: command.to_owned(),
            parameters,
            timestamp: epoch_millis(),
            success: true,
            message: COMMAND_ACK_MESSAGE.to_owned(),
        }
    }
}
