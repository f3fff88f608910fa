use crate::identity::UserId;
use crate::message::outgoing::event_message::{EventMessage, NewMessageNotification, OrderStatusUpdate};
use crate::registry::ConnectionRegistry;
use crate::registry::room_key::RoomKey;
use std::sync::Arc;
use tracing::debug;

/// Pushes transient notification events into user rooms and the admin
/// broadcast room. Strictly a latency optimization: nobody being online is
/// the normal case and never an error, the durable notification record in
/// the storefront's database guarantees eventual visibility.
pub struct NotificationFanout {
	registry: Arc<ConnectionRegistry>,
}

/// Who gets notified about a new message: the order's owning customer or
/// the admin side. Order chats are 1:1, so it is always exactly one of the
/// two.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipient {
	User(UserId),
	Admins,
}

impl NotificationFanout {
	pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
		Self { registry }
	}

	pub fn notify_new_message(&self, recipient: Recipient, notification: NewMessageNotification) {
		let room = match recipient {
			Recipient::User(user_id) => RoomKey::User(user_id),
			Recipient::Admins => RoomKey::AdminBroadcast,
		};
		let delivered = self.registry.broadcast(&room, &EventMessage::NewMessageNotification(notification));
		debug!(%room, delivered, "pushed new-message notification");
	}

	pub fn notify_order_status(&self, owner: UserId, update: OrderStatusUpdate) {
		let room = RoomKey::User(owner);
		let delivered = self.registry.broadcast(&room, &EventMessage::OrderStatusUpdate(update));
		debug!(%room, delivered, "pushed order-status update");
	}
}
