use crate::chat::model::{ChatMessage, Location, MessageDraft, MessageId};
use crate::identity::{Identity, Role, UserId};
use crate::orders::OrderId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The external chat persistence API. All durability lives on the other side
/// of this trait; the realtime layer never stores messages itself.
#[async_trait]
pub trait ChatApi: Send + Sync {
	/// Persist a draft, obtaining the server-assigned id and creation time.
	async fn create_message(
		&self,
		order_id: OrderId,
		sender: &Identity,
		draft: &MessageDraft,
	) -> Result<ChatMessage, ChatApiError>;

	/// Full history of an order's chat, used by clients on mount.
	async fn list_messages(&self, order_id: OrderId) -> Result<Vec<ChatMessage>, ChatApiError>;
}

#[derive(Error, Debug)]
pub enum ChatApiError {
	#[error("Chat API request failed: {0}")]
	Http(#[from] reqwest::Error),
	#[error("Chat API returned unexpected status: {0}")]
	UnexpectedStatus(reqwest::StatusCode),
}

pub struct HttpChatApi {
	client: reqwest::Client,
	base_url: String,
}

impl HttpChatApi {
	pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
		Self {
			client,
			base_url: base_url.into(),
		}
	}
}

// The storefront REST API speaks camelCase; these types keep that convention
// out of the core model.

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateMessageRequest<'a> {
	#[serde(skip_serializing_if = "Option::is_none")]
	content: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	image_url: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	location: Option<&'a Location>,
	is_admin: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageResponse {
	id: MessageId,
	order_id: OrderId,
	sender_id: UserId,
	sender_role: Role,
	#[serde(default)]
	content: Option<String>,
	#[serde(default)]
	image_url: Option<String>,
	#[serde(default)]
	location: Option<Location>,
	created_at: DateTime<Utc>,
}

impl From<MessageResponse> for ChatMessage {
	fn from(response: MessageResponse) -> Self {
		Self {
			id: response.id,
			order_id: response.order_id,
			sender_id: response.sender_id,
			sender_role: response.sender_role,
			content: response.content,
			image_url: response.image_url,
			location: response.location,
			created_at: response.created_at,
		}
	}
}

#[derive(Deserialize)]
struct MessageEnvelope {
	message: MessageResponse,
}

#[derive(Deserialize)]
struct MessageListEnvelope {
	messages: Vec<MessageResponse>,
}

#[async_trait]
impl ChatApi for HttpChatApi {
	async fn create_message(
		&self,
		order_id: OrderId,
		sender: &Identity,
		draft: &MessageDraft,
	) -> Result<ChatMessage, ChatApiError> {
		let url = format!("{}/orders/{order_id}/messages", self.base_url);
		let request = CreateMessageRequest {
			content: draft.content.as_deref(),
			image_url: draft.image_url.as_deref(),
			location: draft.location.as_ref(),
			is_admin: sender.role.is_admin(),
		};

		let response = self.client.post(url).json(&request).send().await?;
		if !response.status().is_success() {
			return Err(ChatApiError::UnexpectedStatus(response.status()));
		}

		let envelope: MessageEnvelope = response.json().await?;
		Ok(envelope.message.into())
	}

	async fn list_messages(&self, order_id: OrderId) -> Result<Vec<ChatMessage>, ChatApiError> {
		let url = format!("{}/orders/{order_id}/messages", self.base_url);
		let response = self.client.get(url).send().await?;
		if !response.status().is_success() {
			return Err(ChatApiError::UnexpectedStatus(response.status()));
		}

		let envelope: MessageListEnvelope = response.json().await?;
		Ok(envelope.messages.into_iter().map(Into::into).collect())
	}
}


#[cfg(test)]
pub use test_utils::InMemoryChatApi;
