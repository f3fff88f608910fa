use crate::identity::UserId;
use crate::orders::OrderId;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

const ADMIN_BROADCAST_KEY: &str = "admin-broadcast";

/// The closed set of room kinds. Rooms are logical and ephemeral; a key only
/// means anything while at least one connection is joined under it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum RoomKey {
	/// Per-order chat between the owning customer and admins.
	Order(OrderId),
	/// Per-user notification channel.
	User(UserId),
	/// Notification channel shared by all admin consoles.
	AdminBroadcast,
}

impl Display for RoomKey {
	fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
		match self {
			RoomKey::Order(order_id) => write!(formatter, "order:{order_id}"),
			RoomKey::User(user_id) => write!(formatter, "user:{user_id}"),
			RoomKey::AdminBroadcast => write!(formatter, "{ADMIN_BROADCAST_KEY}"),
		}
	}
}

impl FromStr for RoomKey {
	type Err = RoomKeyParseError;

	fn from_str(text: &str) -> Result<Self, Self::Err> {
		if text == ADMIN_BROADCAST_KEY {
			return Ok(RoomKey::AdminBroadcast);
		}

		let (kind, id) = text
			.split_once(':')
			.ok_or_else(|| RoomKeyParseError::UnknownKind(text.to_string()))?;
		let uuid = Uuid::from_str(id)?;
		match kind {
			"order" => Ok(RoomKey::Order(uuid.into())),
			"user" => Ok(RoomKey::User(uuid.into())),
			_ => Err(RoomKeyParseError::UnknownKind(kind.to_string())),
		}
	}
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RoomKeyParseError {
	#[error("Unknown room kind: '{0}'")]
	UnknownKind(String),
	#[error("Invalid room id: {0}")]
	InvalidId(#[from] uuid::Error),
}

impl Serialize for RoomKey {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for RoomKey {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let text = String::deserialize(deserializer)?;
		text.parse().map_err(D::Error::custom)
	}
}
