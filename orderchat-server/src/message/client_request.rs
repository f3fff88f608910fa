use crate::chat::model::MessageDraft;
use crate::identity::UserId;
use crate::message::{MessageError, WebSocketMessage, deserialize_message_from_str, serialize_message_to_websocket_message};
use crate::orders::OrderId;
use crate::registry::room_key::RoomKey;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum ClientRequest {
	JoinOrderChat(JoinOrderChatRequest),
	JoinUserNotifications(JoinUserNotificationsRequest),
	JoinAdminNotifications,
	Leave(LeaveRequest),
	SendMessage(SendMessageRequest),
}

impl ClientRequest {
	pub fn kind(&self) -> &'static str {
		use ClientRequest::*;
		match self {
			JoinOrderChat(_) => "join_order_chat",
			JoinUserNotifications(_) => "join_user_notifications",
			JoinAdminNotifications => "join_admin_notifications",
			Leave(_) => "leave",
			SendMessage(_) => "send_message",
		}
	}
}

macro_rules! client_request_from_struct {
	($enum_case: ident, $struct_type: ty) => {
		impl From<$struct_type> for ClientRequest {
			fn from(request: $struct_type) -> ClientRequest {
				ClientRequest::$enum_case(request)
			}
		}
	};
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct JoinOrderChatRequest {
	pub order_id: OrderId,
}

client_request_from_struct!(JoinOrderChat, JoinOrderChatRequest);

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct JoinUserNotificationsRequest {
	pub user_id: UserId,
}

client_request_from_struct!(JoinUserNotifications, JoinUserNotificationsRequest);

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct LeaveRequest {
	pub room: RoomKey,
}

client_request_from_struct!(Leave, LeaveRequest);

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SendMessageRequest {
	pub order_id: OrderId,
	#[serde(flatten)]
	pub draft: MessageDraft,
}

client_request_from_struct!(SendMessage, SendMessageRequest);

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ClientRequestWithId {
	pub request_id: u64,
	#[serde(flatten)]
	pub request: ClientRequest,
}

/// Used to recover the request id for error correlation when the rest of a
/// frame fails to parse.
#[derive(Clone, Debug, Deserialize)]
pub struct RequestIdOnly {
	pub request_id: u64,
}

impl From<&ClientRequestWithId> for WebSocketMessage {
	fn from(request: &ClientRequestWithId) -> Self {
		serialize_message_to_websocket_message(request)
	}
}

impl TryFrom<&WebSocketMessage> for ClientRequestWithId {
	type Error = MessageError;

	fn try_from(websocket_message: &WebSocketMessage) -> Result<Self, Self::Error> {
		match websocket_message {
			WebSocketMessage::Text(json) => deserialize_message_from_str(json.as_str()),
			_ => Err(MessageError::WrongMessageType(websocket_message.clone())),
		}
	}
}

impl TryFrom<&WebSocketMessage> for RequestIdOnly {
	type Error = MessageError;

	fn try_from(websocket_message: &WebSocketMessage) -> Result<Self, Self::Error> {
		match websocket_message {
			WebSocketMessage::Text(json) => deserialize_message_from_str(json.as_str()),
			_ => Err(MessageError::WrongMessageType(websocket_message.clone())),
		}
	}
}
