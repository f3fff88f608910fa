use crate::message::outgoing::error_message::ErrorMessage;
use crate::message::outgoing::event_message::EventMessage;
use crate::message::outgoing::success_message::SuccessMessage;
use crate::message::{MessageError, WebSocketMessage};
use serde::{Deserialize, Serialize};

pub mod error_message;
pub mod event_message;
pub mod success_message;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum OutgoingMessage {
	Success {
		request_id: u64,
		message: SuccessMessage,
	},
	Error {
		request_id: Option<u64>,
		message: ErrorMessage,
	},
	Event {
		message: EventMessage,
	},
}

impl From<&OutgoingMessage> for WebSocketMessage {
	fn from(message: &OutgoingMessage) -> Self {
		crate::message::serialize_message_to_websocket_message(message)
	}
}

impl TryFrom<&WebSocketMessage> for OutgoingMessage {
	type Error = MessageError;

	fn try_from(websocket_message: &WebSocketMessage) -> Result<Self, MessageError> {
		match websocket_message {
			WebSocketMessage::Text(json) => crate::message::deserialize_message_from_str(json.as_str()),
			_ => Err(MessageError::WrongMessageType(websocket_message.clone())),
		}
	}
}
