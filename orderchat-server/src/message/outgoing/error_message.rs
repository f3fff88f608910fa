use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct ErrorMessage {
	pub error: ErrorMessageType,
	pub message: String,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMessageType {
	InvalidFormat,
	InvalidOperation,
	AccessDenied,
	EmptyMessage,
	PersistenceFailed,
	InternalServerError,
}
