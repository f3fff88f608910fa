use crate::connection::receiver::{MessageReceiver, ReceivedMessage};
use crate::connection::sender::MessageSender;
use crate::context::ApplicationContext;
use crate::identity::Identity;
use crate::message::client_request::{
	ClientRequest, JoinOrderChatRequest, JoinUserNotificationsRequest, LeaveRequest, SendMessageRequest,
};
use crate::message::outgoing::error_message::{ErrorMessage, ErrorMessageType};
use crate::message::outgoing::event_message::EventMessage;
use crate::message::outgoing::success_message::SuccessMessage;
use crate::registry::connection_id::ConnectionId;
use crate::registry::room_key::RoomKey;
use crate::relay::RelayError;
use crate::router::RouterError;
use crate::utils::time_source::TimeSource;
use futures_util::{SinkExt, StreamExt};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
	Closed,
	HeartbeatTimeout,
}

/// Drives a single connection from registration to teardown. All room
/// memberships die with the connection, whichever way it goes.
pub async fn run_connection(
	context: ApplicationContext,
	identity: Identity,
	message_sender: MessageSender,
	message_receiver: MessageReceiver,
) {
	let (event_sender, event_receiver) = mpsc::unbounded_channel();
	let connection_id = context.registry.register(event_sender);
	info!(%connection_id, user_id = %identity.user_id, "connection established");

	let missed_heartbeat_limit = context.configuration.missed_heartbeat_limit;
	let (pong_sender, pong_receiver) = futures_channel::mpsc::channel(missed_heartbeat_limit as usize);

	let reason = tokio::select! {
		() = handle_requests(&context, connection_id, &identity, &message_sender, message_receiver, pong_sender) => DisconnectReason::Closed,
		() = pump_events(event_receiver, &message_sender) => DisconnectReason::Closed,
		reason = heartbeat(
			&message_sender,
			&context.time_source,
			pong_receiver,
			context.configuration.heartbeat_interval,
			missed_heartbeat_limit,
		) => reason,
	};

	context.registry.unregister(connection_id);
	info!(%connection_id, ?reason, "connection closed");
}

/// Forward queued room events to the websocket until either side goes away.
async fn pump_events(mut event_receiver: mpsc::UnboundedReceiver<EventMessage>, message_sender: &MessageSender) {
	while let Some(event) = event_receiver.recv().await {
		if message_sender.send_event_message(event).await.is_err() {
			break;
		}
	}
}

pub async fn heartbeat(
	message_sender: &MessageSender,
	time_source: &TimeSource,
	mut pong_receiver: futures_channel::mpsc::Receiver<Vec<u8>>,
	heartbeat_interval: std::time::Duration,
	missed_heartbeat_limit: u8,
) -> DisconnectReason {
	let mut interval = time_source.interval(heartbeat_interval);
	let mut missed_heartbeats = 0;

	for count in 0..u64::MAX {
		interval.tick().await;

		if message_sender.send_ping(count.to_ne_bytes().to_vec()).await.is_err() {
			return DisconnectReason::Closed;
		}

		let receive_pong = async {
			while let Some(payload) = pong_receiver.next().await {
				let payload = match <[u8; 8]>::try_from(payload.as_slice()) {
					Ok(payload) => payload,
					Err(_) => return Err(()),
				};

				if u64::from_ne_bytes(payload) == count {
					return Ok(());
				}
			}
			Err(())
		};
		if time_source.timeout(heartbeat_interval, receive_pong).await.is_err() {
			missed_heartbeats += 1;
			if missed_heartbeats >= missed_heartbeat_limit {
				break;
			}
		} else {
			missed_heartbeats = 0;
		}
	}

	DisconnectReason::HeartbeatTimeout
}

const QUOTA: Quota = Quota::per_second(nonzero!(1u32)).allow_burst(nonzero!(10u32));

async fn handle_requests(
	context: &ApplicationContext,
	connection_id: ConnectionId,
	identity: &Identity,
	message_sender: &MessageSender,
	mut message_receiver: MessageReceiver,
	mut pong_sender: futures_channel::mpsc::Sender<Vec<u8>>,
) {
	let rate_limiter = RateLimiter::direct(QUOTA);
	loop {
		let message = match message_receiver.receive().await {
			ReceivedMessage::Request(message) => message,
			ReceivedMessage::Pong { payload } => {
				if pong_sender.send(payload).await.is_err() {
					break;
				}
				continue;
			}
			ReceivedMessage::Finished => break,
		};

		// rate limit after receiving a message so we don't apply it to pongs
		rate_limiter.until_ready().await;

		debug!(kind = message.request.kind(), %connection_id, "received request");

		let _ = match handle_request(context, connection_id, identity, message.request).await {
			Ok(success_message) => {
				message_sender
					.send_success_message(success_message, message.request_id)
					.await
			}
			Err(error_message) => {
				message_sender
					.send_error_message(error_message, Some(message.request_id))
					.await
			}
		};
	}
}

async fn handle_request(
	context: &ApplicationContext,
	connection_id: ConnectionId,
	identity: &Identity,
	request: ClientRequest,
) -> Result<SuccessMessage, ErrorMessage> {
	use ClientRequest::*;
	match request {
		JoinOrderChat(request) => handle_join_order_chat(context, connection_id, identity, request).await,
		JoinUserNotifications(request) => handle_join_user_notifications(context, connection_id, identity, request),
		JoinAdminNotifications => handle_join_admin_notifications(context, connection_id, identity),
		Leave(request) => handle_leave(context, connection_id, request),
		SendMessage(request) => handle_send_message(context, connection_id, identity, request).await,
	}
}

async fn handle_join_order_chat(
	context: &ApplicationContext,
	connection_id: ConnectionId,
	identity: &Identity,
	JoinOrderChatRequest { order_id }: JoinOrderChatRequest,
) -> Result<SuccessMessage, ErrorMessage> {
	context
		.router
		.join_order_chat(connection_id, order_id, identity)
		.await
		.map_err(router_error_message)?;
	Ok(SuccessMessage::Joined {
		room: RoomKey::Order(order_id),
	})
}

fn handle_join_user_notifications(
	context: &ApplicationContext,
	connection_id: ConnectionId,
	identity: &Identity,
	JoinUserNotificationsRequest { user_id }: JoinUserNotificationsRequest,
) -> Result<SuccessMessage, ErrorMessage> {
	context
		.router
		.join_user_notifications(connection_id, user_id, identity)
		.map_err(router_error_message)?;
	Ok(SuccessMessage::Joined {
		room: RoomKey::User(user_id),
	})
}

fn handle_join_admin_notifications(
	context: &ApplicationContext,
	connection_id: ConnectionId,
	identity: &Identity,
) -> Result<SuccessMessage, ErrorMessage> {
	context
		.router
		.join_admin_notifications(connection_id, identity)
		.map_err(router_error_message)?;
	Ok(SuccessMessage::Joined {
		room: RoomKey::AdminBroadcast,
	})
}

fn handle_leave(
	context: &ApplicationContext,
	connection_id: ConnectionId,
	LeaveRequest { room }: LeaveRequest,
) -> Result<SuccessMessage, ErrorMessage> {
	context.router.leave(connection_id, &room);
	Ok(SuccessMessage::Left { room })
}

async fn handle_send_message(
	context: &ApplicationContext,
	connection_id: ConnectionId,
	identity: &Identity,
	SendMessageRequest { order_id, draft }: SendMessageRequest,
) -> Result<SuccessMessage, ErrorMessage> {
	let message = context
		.relay
		.send_message(order_id, connection_id, identity, draft)
		.await
		.map_err(relay_error_message)?;
	Ok(SuccessMessage::MessageSent { message })
}

fn router_error_message(router_error: RouterError) -> ErrorMessage {
	let error_type = match &router_error {
		RouterError::Denied { .. } => ErrorMessageType::AccessDenied,
		RouterError::Directory(directory_error) => {
			error!("Order lookup failed during join: {directory_error}");
			ErrorMessageType::InternalServerError
		}
	};
	ErrorMessage::builder()
		.error(error_type)
		.message(router_error.to_string())
		.build()
}

fn relay_error_message(relay_error: RelayError) -> ErrorMessage {
	let error_type = match &relay_error {
		RelayError::EmptyMessage => ErrorMessageType::EmptyMessage,
		RelayError::NotJoined => ErrorMessageType::InvalidOperation,
		RelayError::PersistenceFailed(chat_api_error) => {
			error!("Message persistence failed: {chat_api_error}");
			ErrorMessageType::PersistenceFailed
		}
	};
	ErrorMessage::builder()
		.error(error_type)
		.message(relay_error.to_string())
		.build()
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::chat::api::ChatApi;
	use crate::chat::model::MessageDraft;
	use crate::context::test_utils::test_context;
	use crate::identity::Role;
	use crate::message::WebSocketMessage;
	use crate::message::outgoing::OutgoingMessage;
	use crate::orders::OrderSummary;
	use crate::utils::test_client::WebsocketTestClient;
	use uuid::Uuid;

	fn customer_identity() -> Identity {
		Identity {
			user_id: Uuid::from_u128(7).into(),
			role: Role::Customer,
			display_name: "Alice".to_string(),
		}
	}

	fn admin_identity() -> Identity {
		Identity {
			user_id: Uuid::from_u128(1000).into(),
			role: Role::Admin,
			display_name: "Support".to_string(),
		}
	}

	fn known_order() -> OrderSummary {
		OrderSummary {
			order_id: Uuid::from_u128(42).into(),
			order_number: "ORD-2024-0117".to_string(),
			customer_id: Uuid::from_u128(7).into(),
		}
	}

	fn register_connection(context: &ApplicationContext) -> ConnectionId {
		let (event_sender, _event_receiver) = mpsc::unbounded_channel();
		context.registry.register(event_sender)
	}

	#[tokio::test]
	async fn foreign_customer_should_get_access_denied_for_an_order_chat() {
		let (context, _chat_api, order_directory) = test_context();
		order_directory.insert(known_order());
		let connection_id = register_connection(&context);
		let stranger = Identity {
			user_id: Uuid::from_u128(8).into(),
			role: Role::Customer,
			display_name: "Mallory".to_string(),
		};

		let error = handle_request(
			&context,
			connection_id,
			&stranger,
			JoinOrderChatRequest {
				order_id: known_order().order_id,
			}
			.into(),
		)
		.await
		.expect_err("Foreign customer was let into the order chat");

		assert_eq!(ErrorMessageType::AccessDenied, error.error);
		assert!(
			context
				.registry
				.members_of(&RoomKey::Order(known_order().order_id))
				.is_empty()
		);
	}

	#[tokio::test]
	async fn owner_and_admin_should_join_the_order_chat() {
		let (context, _chat_api, order_directory) = test_context();
		order_directory.insert(known_order());
		let owner_connection = register_connection(&context);
		let admin_connection = register_connection(&context);
		let room = RoomKey::Order(known_order().order_id);

		let response = handle_request(
			&context,
			owner_connection,
			&customer_identity(),
			JoinOrderChatRequest {
				order_id: known_order().order_id,
			}
			.into(),
		)
		.await
		.expect("Owner could not join");
		assert_eq!(SuccessMessage::Joined { room }, response);

		handle_request(
			&context,
			admin_connection,
			&admin_identity(),
			JoinOrderChatRequest {
				order_id: known_order().order_id,
			}
			.into(),
		)
		.await
		.expect("Admin could not join");

		assert_eq!(2, context.registry.members_of(&room).len());
	}

	#[tokio::test]
	async fn empty_message_should_be_rejected() {
		let (context, chat_api, order_directory) = test_context();
		order_directory.insert(known_order());
		let connection_id = register_connection(&context);
		handle_request(
			&context,
			connection_id,
			&customer_identity(),
			JoinOrderChatRequest {
				order_id: known_order().order_id,
			}
			.into(),
		)
		.await
		.expect("Owner could not join");

		let error = handle_request(
			&context,
			connection_id,
			&customer_identity(),
			SendMessageRequest {
				order_id: known_order().order_id,
				draft: MessageDraft::text(" \t"),
			}
			.into(),
		)
		.await
		.expect_err("Empty message was accepted");

		assert_eq!(ErrorMessageType::EmptyMessage, error.error);
		assert!(chat_api.list_messages(known_order().order_id).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn send_without_join_should_be_rejected() {
		let (context, _chat_api, order_directory) = test_context();
		order_directory.insert(known_order());
		let connection_id = register_connection(&context);

		let error = handle_request(
			&context,
			connection_id,
			&customer_identity(),
			SendMessageRequest {
				order_id: known_order().order_id,
				draft: MessageDraft::text("hello"),
			}
			.into(),
		)
		.await
		.expect_err("Send without join was accepted");

		assert_eq!(ErrorMessageType::InvalidOperation, error.error);
	}

	#[tokio::test]
	async fn persistence_failure_should_be_reported_and_nothing_broadcast() {
		let (context, chat_api, order_directory) = test_context();
		order_directory.insert(known_order());
		let (event_sender, mut events) = mpsc::unbounded_channel();
		let connection_id = context.registry.register(event_sender);
		handle_request(
			&context,
			connection_id,
			&customer_identity(),
			JoinOrderChatRequest {
				order_id: known_order().order_id,
			}
			.into(),
		)
		.await
		.expect("Owner could not join");
		chat_api.fail_creates(true);

		let error = handle_request(
			&context,
			connection_id,
			&customer_identity(),
			SendMessageRequest {
				order_id: known_order().order_id,
				draft: MessageDraft::text("lost draft"),
			}
			.into(),
		)
		.await
		.expect_err("Send succeeded despite persistence failure");

		assert_eq!(ErrorMessageType::PersistenceFailed, error.error);
		assert!(events.try_recv().is_err());
		assert!(chat_api.list_messages(known_order().order_id).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn connection_should_join_and_relay_over_the_full_loop() {
		let (context, _chat_api, order_directory) = test_context();
		order_directory.insert(known_order());
		let order_id = known_order().order_id;

		let (message_sender, message_receiver, mut test_client) = WebsocketTestClient::new();
		tokio::spawn(run_connection(
			context.clone(),
			customer_identity(),
			message_sender,
			message_receiver,
		));

		let request_id = test_client.send_request(JoinOrderChatRequest { order_id }).await;
		assert_eq!(
			SuccessMessage::Joined {
				room: RoomKey::Order(order_id)
			},
			test_client.receive_success_message(request_id).await
		);

		let request_id = test_client
			.send_request(SendMessageRequest {
				order_id,
				draft: MessageDraft::text("Where is my order?"),
			})
			.await;

		// the broadcast is pumped concurrently with the reply, either may
		// arrive first
		let first = OutgoingMessage::try_from(&test_client.receive_raw().await).unwrap();
		let second = OutgoingMessage::try_from(&test_client.receive_raw().await).unwrap();

		let mut sent_message = None;
		let mut received_event = None;
		for outgoing in [first, second] {
			match outgoing {
				OutgoingMessage::Success {
					request_id: reply_id,
					message: SuccessMessage::MessageSent { message },
				} => {
					assert_eq!(request_id, reply_id);
					sent_message = Some(message);
				}
				OutgoingMessage::Event {
					message: EventMessage::ReceiveMessage(message),
				} => received_event = Some(message),
				outgoing => panic!("Unexpected message: {outgoing:?}"),
			}
		}

		let sent_message = sent_message.expect("No send confirmation received");
		let received_event = received_event.expect("No broadcast received");
		assert_eq!(sent_message, received_event);
		assert_eq!(Some("Where is my order?".to_string()), sent_message.content);
	}

	#[tokio::test]
	async fn disconnect_should_tear_down_all_memberships() {
		let (context, _chat_api, order_directory) = test_context();
		order_directory.insert(known_order());
		let order_id = known_order().order_id;
		let room = RoomKey::Order(order_id);

		let (message_sender, message_receiver, mut test_client) = WebsocketTestClient::new();
		let connection_task = tokio::spawn(run_connection(
			context.clone(),
			customer_identity(),
			message_sender,
			message_receiver,
		));

		let request_id = test_client.send_request(JoinOrderChatRequest { order_id }).await;
		test_client.receive_success_message(request_id).await;
		assert_eq!(1, context.registry.members_of(&room).len());

		drop(test_client);
		connection_task.await.expect("Connection task panicked");

		assert!(context.registry.members_of(&room).is_empty());
	}

	#[tokio::test]
	async fn malformed_frames_should_produce_an_invalid_format_error() {
		let (context, _chat_api, _order_directory) = test_context();

		let (message_sender, message_receiver, mut test_client) = WebsocketTestClient::new();
		tokio::spawn(run_connection(
			context.clone(),
			customer_identity(),
			message_sender,
			message_receiver,
		));

		test_client
			.send_raw(WebSocketMessage::Text("this is not json".into()))
			.await;

		let error = test_client.receive_error_message(None).await;
		assert_eq!(ErrorMessageType::InvalidFormat, error.error);
	}

	#[tokio::test]
	async fn should_send_heartbeats_with_test_time_source() {
		let time_source = TimeSource::test();
		let (message_sender, _message_receiver, mut test_client) = WebsocketTestClient::new();
		let (mut pong_sender, pong_receiver) = futures_channel::mpsc::channel(0);

		let heartbeat_interval = std::time::Duration::from_millis(1);

		let time_source_for_heartbeat = time_source.clone();
		tokio::spawn(async move {
			heartbeat(&message_sender, &time_source_for_heartbeat, pong_receiver, heartbeat_interval, 0).await;
		});

		time_source.wait_for_time_request().await;
		for _ in 0..3 {
			time_source.advance_time(heartbeat_interval);
			let payload = test_client.receive_ping().await;
			pong_sender.send(payload).await.unwrap();
		}
	}

	#[tokio::test]
	async fn should_send_heartbeats_with_real_time_source() {
		let time_source = TimeSource::default();
		let (message_sender, _message_receiver, mut test_client) = WebsocketTestClient::new();
		let (mut pong_sender, pong_receiver) = futures_channel::mpsc::channel(0);

		let heartbeat_interval = std::time::Duration::from_millis(1);

		tokio::spawn(async move {
			heartbeat(&message_sender, &time_source, pong_receiver, heartbeat_interval, 0).await;
		});

		let payload = test_client.receive_ping().await;
		pong_sender.send(payload).await.unwrap();
	}

	#[tokio::test]
	async fn should_stop_after_missed_heartbeat_limit_with_test_time_source() {
		let time_source = TimeSource::test();
		let (message_sender, _message_receiver, _test_client) = WebsocketTestClient::new();
		let (_pong_sender, pong_receiver) = futures_channel::mpsc::channel(0);

		let heartbeat_interval = std::time::Duration::from_millis(1);
		let missed_heartbeat_limit = 1;

		// task for advancing test time
		let time_source_for_test = time_source.clone();
		tokio::spawn(async move {
			let time_source = time_source_for_test;

			time_source.wait_for_time_request().await;
			time_source.advance_time(heartbeat_interval);

			time_source.wait_for_time_request().await;
			time_source.advance_time(heartbeat_interval);
		});

		let reason = heartbeat(
			&message_sender,
			&time_source,
			pong_receiver,
			heartbeat_interval,
			missed_heartbeat_limit,
		)
		.await;
		assert_eq!(DisconnectReason::HeartbeatTimeout, reason);
	}

	#[tokio::test]
	async fn should_stop_after_missed_heartbeats_with_real_time_source() {
		let time_source = TimeSource::default();
		let (message_sender, _message_receiver, _test_client) = WebsocketTestClient::new();
		let (_pong_sender, pong_receiver) = futures_channel::mpsc::channel(0);

		let heartbeat_interval = std::time::Duration::from_millis(1);
		let missed_heartbeat_limit = 1;

		let reason = heartbeat(
			&message_sender,
			&time_source,
			pong_receiver,
			heartbeat_interval,
			missed_heartbeat_limit,
		)
		.await;
		assert_eq!(DisconnectReason::HeartbeatTimeout, reason);
	}
}
