use crate::identity::{Identity, UserId};
use crate::orders::{DirectoryError, OrderDirectory, OrderId};
use crate::registry::ConnectionRegistry;
use crate::registry::connection_id::ConnectionId;
use crate::registry::room_key::RoomKey;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Decides which rooms a connection may join. Authorization is the only
/// concern here; membership bookkeeping lives in the registry. A rejected
/// join is a typed result and never affects other connections' rooms.
pub struct RoomRouter {
	registry: Arc<ConnectionRegistry>,
	order_directory: Arc<dyn OrderDirectory>,
}

#[derive(Error, Debug)]
pub enum RouterError {
	#[error("Access to {room} was denied.")]
	Denied { room: RoomKey },
	#[error("Failed to resolve the order: {0}")]
	Directory(#[from] DirectoryError),
}

impl RoomRouter {
	pub fn new(registry: Arc<ConnectionRegistry>, order_directory: Arc<dyn OrderDirectory>) -> Self {
		Self {
			registry,
			order_directory,
		}
	}

	/// Join an order's chat room. Allowed for the order's owning customer and
	/// for admins; unknown orders are denied the same way as foreign ones.
	pub async fn join_order_chat(
		&self,
		connection_id: ConnectionId,
		order_id: OrderId,
		identity: &Identity,
	) -> Result<(), RouterError> {
		let room = RoomKey::Order(order_id);

		if !identity.role.is_admin() {
			let order = self.order_directory.lookup(order_id).await?;
			let is_owner = order.is_some_and(|order| order.customer_id == identity.user_id);
			if !is_owner {
				return Err(RouterError::Denied { room });
			}
		}

		self.registry.join(connection_id, room);
		info!(%connection_id, %room, "joined order chat");
		Ok(())
	}

	/// Join a user's notification room. Restricted to the user themselves and
	/// to admins. The system this replaces accepted any user id here; that
	/// was an open hole, not a contract.
	pub fn join_user_notifications(
		&self,
		connection_id: ConnectionId,
		user_id: UserId,
		identity: &Identity,
	) -> Result<(), RouterError> {
		let room = RoomKey::User(user_id);

		if identity.user_id != user_id && !identity.role.is_admin() {
			return Err(RouterError::Denied { room });
		}

		self.registry.join(connection_id, room);
		info!(%connection_id, %room, "joined user notifications");
		Ok(())
	}

	/// Join the shared admin notification room.
	pub fn join_admin_notifications(&self, connection_id: ConnectionId, identity: &Identity) -> Result<(), RouterError> {
		if !identity.role.is_admin() {
			return Err(RouterError::Denied {
				room: RoomKey::AdminBroadcast,
			});
		}

		self.registry.join(connection_id, RoomKey::AdminBroadcast);
		info!(%connection_id, "joined admin notifications");
		Ok(())
	}

	/// Explicit leave. Idempotent, infallible.
	pub fn leave(&self, connection_id: ConnectionId, room: &RoomKey) {
		self.registry.leave(connection_id, room);
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::identity::Role;
	use crate::orders::{InMemoryOrderDirectory, OrderSummary};
	use tokio::sync::mpsc;
	use uuid::Uuid;

	fn customer(user_id: u128) -> Identity {
		Identity {
			user_id: Uuid::from_u128(user_id).into(),
			role: Role::Customer,
			display_name: "Alice".to_string(),
		}
	}

	fn admin() -> Identity {
		Identity {
			user_id: Uuid::from_u128(1000).into(),
			role: Role::Admin,
			display_name: "Support".to_string(),
		}
	}

	fn router_with_order(owner_id: u128) -> (RoomRouter, Arc<ConnectionRegistry>, OrderId) {
		let registry = Arc::new(ConnectionRegistry::default());
		let order_directory = Arc::new(InMemoryOrderDirectory::default());
		let order_id = OrderId::from(Uuid::from_u128(42));
		order_directory.insert(OrderSummary {
			order_id,
			order_number: "ORD-2024-0117".to_string(),
			customer_id: Uuid::from_u128(owner_id).into(),
		});
		let router = RoomRouter::new(registry.clone(), order_directory);
		(router, registry, order_id)
	}

	fn register(registry: &ConnectionRegistry) -> ConnectionId {
		let (event_sender, _event_receiver) = mpsc::unbounded_channel();
		registry.register(event_sender)
	}

	#[tokio::test]
	async fn owning_customer_should_join_the_order_chat() {
		let (router, registry, order_id) = router_with_order(7);
		let connection_id = register(&registry);

		router
			.join_order_chat(connection_id, order_id, &customer(7))
			.await
			.expect("Owner was not allowed into the order chat");

		assert!(registry.is_member(connection_id, &RoomKey::Order(order_id)));
	}

	#[tokio::test]
	async fn admin_should_join_any_order_chat() {
		let (router, registry, order_id) = router_with_order(7);
		let connection_id = register(&registry);

		router
			.join_order_chat(connection_id, order_id, &admin())
			.await
			.expect("Admin was not allowed into the order chat");

		assert!(registry.is_member(connection_id, &RoomKey::Order(order_id)));
	}

	#[tokio::test]
	async fn foreign_customer_should_be_denied_and_not_become_a_member() {
		let (router, registry, order_id) = router_with_order(7);
		let connection_id = register(&registry);

		let result = router.join_order_chat(connection_id, order_id, &customer(8)).await;

		assert!(matches!(result, Err(RouterError::Denied { .. })));
		assert!(registry.members_of(&RoomKey::Order(order_id)).is_empty());
	}

	#[tokio::test]
	async fn unknown_order_should_be_denied_for_customers() {
		let registry = Arc::new(ConnectionRegistry::default());
		let router = RoomRouter::new(registry.clone(), Arc::new(InMemoryOrderDirectory::default()));
		let connection_id = register(&registry);
		let order_id = OrderId::from(Uuid::from_u128(999));

		let result = router.join_order_chat(connection_id, order_id, &customer(7)).await;

		assert!(matches!(result, Err(RouterError::Denied { .. })));
	}

	#[tokio::test]
	async fn user_notifications_should_be_restricted_to_the_user_and_admins() {
		let (router, registry, _) = router_with_order(7);
		let connection_id = register(&registry);
		let own_user_id = UserId::from(Uuid::from_u128(7));
		let other_user_id = UserId::from(Uuid::from_u128(8));

		router
			.join_user_notifications(connection_id, own_user_id, &customer(7))
			.expect("User was not allowed into their own notification room");
		assert!(registry.is_member(connection_id, &RoomKey::User(own_user_id)));

		let result = router.join_user_notifications(connection_id, other_user_id, &customer(7));
		assert!(matches!(result, Err(RouterError::Denied { .. })));
		assert!(!registry.is_member(connection_id, &RoomKey::User(other_user_id)));

		router
			.join_user_notifications(connection_id, other_user_id, &admin())
			.expect("Admin was not allowed into a user notification room");
	}

	#[tokio::test]
	async fn admin_broadcast_should_be_admin_only() {
		let (router, registry, _) = router_with_order(7);
		let connection_id = register(&registry);

		let result = router.join_admin_notifications(connection_id, &customer(7));
		assert!(matches!(result, Err(RouterError::Denied { .. })));
		assert!(!registry.is_member(connection_id, &RoomKey::AdminBroadcast));

		router
			.join_admin_notifications(connection_id, &admin())
			.expect("Admin was not allowed into the admin broadcast room");
		assert!(registry.is_member(connection_id, &RoomKey::AdminBroadcast));
	}

	#[tokio::test]
	async fn leave_should_be_idempotent() {
		let (router, registry, order_id) = router_with_order(7);
		let connection_id = register(&registry);
		let room = RoomKey::Order(order_id);

		router
			.join_order_chat(connection_id, order_id, &customer(7))
			.await
			.expect("Owner was not allowed into the order chat");
		router.leave(connection_id, &room);
		router.leave(connection_id, &room);

		assert!(!registry.is_member(connection_id, &room));
	}
}
