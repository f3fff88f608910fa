use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Who is on the other end of a connection. Established by the hosting
/// application's auth layer before any join call; the realtime core trusts
/// it as given.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Identity {
	pub user_id: UserId,
	pub role: Role,
	pub display_name: String,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
	Customer,
	Admin,
}

impl Role {
	pub fn is_admin(self) -> bool {
		matches!(self, Role::Admin)
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl From<Uuid> for UserId {
	fn from(uuid: Uuid) -> Self {
		UserId(uuid)
	}
}

impl From<UserId> for Uuid {
	fn from(user_id: UserId) -> Self {
		user_id.0
	}
}

impl Display for UserId {
	fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
		write!(formatter, "{}", self.0)
	}
}
