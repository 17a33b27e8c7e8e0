//! Command dispatch
//!
//! A command is durable first: it is always appended to the device's queue,
//! whether or not anyone is subscribed to the device room, because the
//! device may fetch queued commands later through its own pull path. Live
//! delivery on top of that is best-effort.

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::protocol::events::name;
use crate::protocol::{Command, CommandStatus, OutboundFrame};
use crate::registry::RoomKey;

use super::core::DeviceHub;

impl DeviceHub {
    /// Issue a command toward a device
    ///
    /// Appends to the durable queue unconditionally, then publishes
    /// `device:command` to the device's room for live listeners. A queue
    /// append failure is logged; live delivery still proceeds.
    pub async fn issue_command(
        &self,
        device_id: &str,
        command: &str,
        payload: Option<Value>,
        issuer_id: &str,
    ) -> Result<Command> {
        let command = Command {
            id: Uuid::new_v4(),
            device_id: device_id.to_string(),
            command: command.to_string(),
            payload,
            issuer_id: issuer_id.to_string(),
            timestamp: Utc::now(),
            status: CommandStatus::Pending,
        };

        tracing::info!(
            command_id = %command.id,
            device_id,
            issuer_id,
            name = %command.command,
            "Command issued"
        );

        match self.command_queue().append(&command).await {
            Ok(queued) => {
                self.stats().record_command();
                tracing::debug!(command_id = %command.id, queued, "Command queued");
            }
            Err(e) => {
                tracing::warn!(command_id = %command.id, error = %e, "Command queue append failed");
            }
        }

        let frame = OutboundFrame::new(name::DEVICE_COMMAND, &command)?;
        self.publish(&RoomKey::Device(device_id.to_string()), frame)
            .await;

        Ok(command)
    }
}
