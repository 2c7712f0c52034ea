//! Turn and activity rules for outbound input.
//!
//! Builds `clientContent` and `realtimeInput` events and rejects malformed
//! ones before anything reaches the outbound queue.

use crate::config::LiveConnectConfig;
use crate::error::{LiveError, Result};
use crate::events::{ClientContent, ClientEvent, RealtimeInput};
use genai_types::Content;

/// Validates turn-based and realtime input for one session.
#[derive(Debug, Clone, Copy)]
pub struct ActivityController {
    automatic_activity_detection: bool,
}

impl ActivityController {
    /// Create a controller.
    pub fn new(automatic_activity_detection: bool) -> Self {
        Self { automatic_activity_detection }
    }

    /// Controller for the settings a session was opened with.
    pub fn from_config(config: &LiveConnectConfig) -> Self {
        Self::new(config.automatic_activity_detection_enabled())
    }

    /// Whether the server detects user activity on its own.
    pub fn automatic_activity_detection(&self) -> bool {
        self.automatic_activity_detection
    }

    /// Build a `clientContent` event from normalized turns.
    ///
    /// `turn_complete = false` leaves the turn open so later content or
    /// realtime input continues it.
    pub fn client_content(&self, turns: Vec<Content>, turn_complete: bool) -> Result<ClientEvent> {
        if turns.iter().all(|turn| turn.non_empty_parts() == 0) {
            return Err(LiveError::validation("turns is required"));
        }
        Ok(ClientEvent::ClientContent(ClientContent { turns, turn_complete }))
    }

    /// Build a `realtimeInput` event. Exactly one input field must be set.
    pub fn realtime_input(&self, input: RealtimeInput) -> Result<ClientEvent> {
        let fields = input.set_fields();
        match fields.len() {
            1 => {}
            0 => {
                return Err(LiveError::validation(
                    "realtime input requires exactly one of media, audio, video, text, activityStart, activityEnd or audioStreamEnd",
                ));
            }
            _ => {
                return Err(LiveError::validation(format!(
                    "realtime input must set exactly one field, got {}",
                    fields.join(", ")
                )));
            }
        }

        if input.is_activity_marker() && self.automatic_activity_detection {
            tracing::warn!(
                field = fields[0],
                "activity marker sent while automatic activity detection is enabled; the server will reject it"
            );
        }

        Ok(ClientEvent::RealtimeInput(input))
    }
}
