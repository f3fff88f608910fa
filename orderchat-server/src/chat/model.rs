use crate::identity::{Role, UserId};
use crate::orders::OrderId;
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// A persisted chat message within an order's chat. Created once by the
/// external chat API, never mutated or deleted afterwards. `created_at`
/// (ties broken by `id`) is the authoritative display order, not arrival
/// order.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ChatMessage {
	pub id: MessageId,
	pub order_id: OrderId,
	pub sender_id: UserId,
	pub sender_role: Role,
	#[serde(default)]
	pub content: Option<String>,
	#[serde(default)]
	pub image_url: Option<String>,
	#[serde(default)]
	pub location: Option<Location>,
	pub created_at: DateTime<Utc>,
}

impl ChatMessage {
	pub fn sort_key(&self) -> (DateTime<Utc>, MessageId) {
		(self.created_at, self.id)
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl From<Uuid> for MessageId {
	fn from(uuid: Uuid) -> Self {
		MessageId(uuid)
	}
}

impl From<MessageId> for Uuid {
	fn from(message_id: MessageId) -> Self {
		message_id.0
	}
}

impl Display for MessageId {
	fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
		write!(formatter, "{}", self.0)
	}
}

/// What a participant wants to send. At least one of the three parts must be
/// present for the draft to be sendable.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct MessageDraft {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<Location>,
}

impl MessageDraft {
	pub fn text(content: impl Into<String>) -> Self {
		Self {
			content: Some(content.into()),
			..Self::default()
		}
	}

	pub fn is_empty(&self) -> bool {
		self.content.as_deref().is_none_or(|content| content.trim().is_empty())
			&& self.image_url.is_none()
			&& self.location.is_none()
	}
}

/// Geographic coordinates of a live location share. Serialized as a
/// `"latitude,longitude"` string, matching the storefront's REST contract.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
	pub latitude: f64,
	pub longitude: f64,
}

impl Location {
	/// The map affordance a client renders instead of plain text.
	pub fn map_link(&self) -> String {
		format!(
			"https://www.openstreetmap.org/?mlat={}&mlon={}",
			self.latitude, self.longitude
		)
	}
}

impl Display for Location {
	fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
		write!(formatter, "{},{}", self.latitude, self.longitude)
	}
}

impl FromStr for Location {
	type Err = LocationParseError;

	fn from_str(text: &str) -> Result<Self, Self::Err> {
		let (latitude, longitude) = text.split_once(',').ok_or(LocationParseError::MissingComma)?;
		let latitude: f64 = latitude.trim().parse()?;
		let longitude: f64 = longitude.trim().parse()?;

		if !(-90.0..=90.0).contains(&latitude) {
			return Err(LocationParseError::LatitudeOutOfRange(latitude));
		}
		if !(-180.0..=180.0).contains(&longitude) {
			return Err(LocationParseError::LongitudeOutOfRange(longitude));
		}

		Ok(Location { latitude, longitude })
	}
}

#[derive(Error, Debug, PartialEq)]
pub enum LocationParseError {
	#[error("Location must be of the form 'latitude,longitude'.")]
	MissingComma,
	#[error("Location coordinate is not a number: {0}")]
	NotANumber(#[from] std::num::ParseFloatError),
	#[error("Latitude is out of range: {0}")]
	LatitudeOutOfRange(f64),
	#[error("Longitude is out of range: {0}")]
	LongitudeOutOfRange(f64),
}

impl Serialize for Location {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for Location {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let text = String::deserialize(deserializer)?;
		text.parse().map_err(D::Error::custom)
	}
}
