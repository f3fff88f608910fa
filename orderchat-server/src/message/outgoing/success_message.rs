use crate::chat::model::ChatMessage;
use crate::registry::room_key::RoomKey;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum SuccessMessage {
	Joined { room: RoomKey },
	Left { room: RoomKey },
	MessageSent { message: ChatMessage },
}
