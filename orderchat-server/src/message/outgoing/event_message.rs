use crate::chat::model::ChatMessage;
use crate::orders::OrderId;
use serde::{Deserialize, Serialize};

/// Events pushed to room members outside the request/response cycle. All of
/// them are best-effort: an empty room is the expected common case, durable
/// visibility is the external notification record's job.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum EventMessage {
	ReceiveMessage(ChatMessage),
	NewMessageNotification(NewMessageNotification),
	OrderStatusUpdate(OrderStatusUpdate),
}

macro_rules! event_from_struct {
	($enum_case: ident, $struct_type: ty) => {
		impl From<$struct_type> for EventMessage {
			fn from(event: $struct_type) -> EventMessage {
				EventMessage::$enum_case(event)
			}
		}
	};
}

event_from_struct!(ReceiveMessage, ChatMessage);

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct NewMessageNotification {
	pub order_id: OrderId,
	pub sender_name: String,
	#[serde(default)]
	pub content: Option<String>,
}

event_from_struct!(NewMessageNotification, NewMessageNotification);

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct OrderStatusUpdate {
	pub order_number: String,
	pub status: String,
}

event_from_struct!(OrderStatusUpdate, OrderStatusUpdate);
