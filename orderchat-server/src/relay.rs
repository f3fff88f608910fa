use crate::chat::api::{ChatApi, ChatApiError};
use crate::chat::model::{ChatMessage, MessageDraft};
use crate::identity::{Identity, Role};
use crate::message::outgoing::event_message::{EventMessage, NewMessageNotification};
use crate::notifier::{NotificationFanout, Recipient};
use crate::orders::{OrderDirectory, OrderId};
use crate::registry::ConnectionRegistry;
use crate::registry::connection_id::ConnectionId;
use crate::registry::room_key::RoomKey;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Accepts message submissions, persists them through the external chat API
/// and fans the persisted result out to the order room. The broadcast only
/// happens after persistence succeeded; a message without a durable id
/// cannot be deduplicated by clients.
pub struct MessageRelay {
	registry: Arc<ConnectionRegistry>,
	chat_api: Arc<dyn ChatApi>,
	order_directory: Arc<dyn OrderDirectory>,
	notifier: Arc<NotificationFanout>,
}

#[derive(Error, Debug)]
pub enum RelayError {
	#[error("A message needs text, an image or a location.")]
	EmptyMessage,
	#[error("Join the order chat before sending messages.")]
	NotJoined,
	#[error("Failed to store the message: {0}")]
	PersistenceFailed(#[source] ChatApiError),
}

impl MessageRelay {
	pub fn new(
		registry: Arc<ConnectionRegistry>,
		chat_api: Arc<dyn ChatApi>,
		order_directory: Arc<dyn OrderDirectory>,
		notifier: Arc<NotificationFanout>,
	) -> Self {
		Self {
			registry,
			chat_api,
			order_directory,
			notifier,
		}
	}

	/// The sender's own connection receives the broadcast too; clients
	/// deduplicate by message id, so correctness does not depend on echo
	/// suppression.
	pub async fn send_message(
		&self,
		order_id: OrderId,
		sender_connection_id: ConnectionId,
		sender: &Identity,
		draft: MessageDraft,
	) -> Result<ChatMessage, RelayError> {
		if draft.is_empty() {
			return Err(RelayError::EmptyMessage);
		}

		let room = RoomKey::Order(order_id);
		if !self.registry.is_member(sender_connection_id, &room) {
			return Err(RelayError::NotJoined);
		}

		let message = self
			.chat_api
			.create_message(order_id, sender, &draft)
			.await
			.map_err(RelayError::PersistenceFailed)?;

		let delivered = self
			.registry
			.broadcast(&room, &EventMessage::ReceiveMessage(message.clone()));
		debug!(%room, delivered, message_id = %message.id, "relayed chat message");

		self.notify_counterparty(&message, sender).await;

		Ok(message)
	}

	/// Order chats are 1:1, so exactly one non-sender party gets the
	/// notification. Failures here never fail the send.
	async fn notify_counterparty(&self, message: &ChatMessage, sender: &Identity) {
		let notification = NewMessageNotification {
			order_id: message.order_id,
			sender_name: sender.display_name.clone(),
			content: message.content.clone(),
		};

		match sender.role {
			Role::Customer => self.notifier.notify_new_message(Recipient::Admins, notification),
			Role::Admin => match self.order_directory.lookup(message.order_id).await {
				Ok(Some(order)) => self
					.notifier
					.notify_new_message(Recipient::User(order.customer_id), notification),
				Ok(None) => warn!(order_id = %message.order_id, "skipping notification, order is unknown"),
				Err(error) => warn!(%error, "skipping notification, order lookup failed"),
			},
		}
	}
}
