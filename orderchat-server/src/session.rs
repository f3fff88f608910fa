use crate::chat::model::{ChatMessage, MessageDraft, MessageId};
use crate::message::client_request::{
	ClientRequest, JoinOrderChatRequest, JoinUserNotificationsRequest, LeaveRequest,
};
use crate::message::outgoing::event_message::{EventMessage, OrderStatusUpdate};
use crate::registry::room_key::RoomKey;
use std::collections::{BTreeSet, HashSet};

/// Client-side session state for one browser tab, kept free of any transport
/// so the contract is testable on its own. The server never resumes a
/// session: after a reconnect, every wanted room is joined again from
/// scratch and history comes from the REST fetch.
///
/// The message list deduplicates by id. Some transport configurations loop a
/// sender's own emission back, so a message may legitimately arrive twice;
/// rendering it twice would be the bug.
pub struct ChatSession {
	state: SessionState,
	wanted_rooms: BTreeSet<RoomKey>,
	messages: Vec<ChatMessage>,
	seen_message_ids: HashSet<MessageId>,
	compose: MessageDraft,
	unread_notifications: u64,
	latest_order_status: Option<OrderStatusUpdate>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
	Disconnected,
	Connecting,
	Joined,
	Degraded,
}

/// What the connection indicator in the chat header shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionIndicator {
	Green,
	Red,
}

impl Default for ChatSession {
	fn default() -> Self {
		Self {
			state: SessionState::Disconnected,
			wanted_rooms: BTreeSet::new(),
			messages: Vec::new(),
			seen_message_ids: HashSet::new(),
			compose: MessageDraft::default(),
			unread_notifications: 0,
			latest_order_status: None,
		}
	}
}

impl ChatSession {
	pub fn state(&self) -> SessionState {
		self.state
	}

	pub fn indicator(&self) -> ConnectionIndicator {
		match self.state {
			SessionState::Joined => ConnectionIndicator::Green,
			_ => ConnectionIndicator::Red,
		}
	}

	/// Mark a room as wanted. Survives reconnects so the session can rejoin.
	pub fn watch_room(&mut self, room: RoomKey) {
		self.wanted_rooms.insert(room);
	}

	/// Stop watching a room, returning the leave request to send if the
	/// session is currently connected.
	pub fn unwatch_room(&mut self, room: RoomKey) -> Option<ClientRequest> {
		self.wanted_rooms.remove(&room);
		match self.state {
			SessionState::Joined | SessionState::Degraded => Some(LeaveRequest { room }.into()),
			_ => None,
		}
	}

	/// The transport started connecting.
	pub fn connect(&mut self) {
		self.state = SessionState::Connecting;
	}

	/// The transport is up. Returns the join requests to issue; there is no
	/// server-side session resumption.
	pub fn connected(&mut self) -> Vec<ClientRequest> {
		self.state = SessionState::Joined;
		self.wanted_rooms.iter().map(join_request).collect()
	}

	/// A join was rejected. The room is dropped from the wanted set and the
	/// session shows up as degraded.
	pub fn join_denied(&mut self, room: &RoomKey) {
		self.wanted_rooms.remove(room);
		self.state = SessionState::Degraded;
	}

	/// The transport dropped. Rendered messages and the wanted-room set are
	/// kept for the next reconnect.
	pub fn connection_lost(&mut self) {
		self.state = SessionState::Disconnected;
	}

	/// Seed the message list from the REST history fetch.
	pub fn load_history(&mut self, history: Vec<ChatMessage>) {
		for message in history {
			self.insert_message(message);
		}
	}

	/// Apply an incoming event. Returns whether anything visible changed.
	pub fn handle_event(&mut self, event: EventMessage) -> bool {
		match event {
			EventMessage::ReceiveMessage(message) => self.insert_message(message),
			EventMessage::NewMessageNotification(_) => {
				self.unread_notifications += 1;
				true
			}
			EventMessage::OrderStatusUpdate(update) => {
				self.latest_order_status = Some(update);
				true
			}
		}
	}

	/// Messages in display order: `created_at`, ties broken by id.
	pub fn messages(&self) -> &[ChatMessage] {
		&self.messages
	}

	pub fn unread_notifications(&self) -> u64 {
		self.unread_notifications
	}

	pub fn latest_order_status(&self) -> Option<&OrderStatusUpdate> {
		self.latest_order_status.as_ref()
	}

	pub fn compose(&mut self) -> &mut MessageDraft {
		&mut self.compose
	}

	/// Optimistically clear the compose box for sending.
	pub fn take_draft(&mut self) -> MessageDraft {
		std::mem::take(&mut self.compose)
	}

	/// A send failed; put the draft back so nothing is silently lost. There
	/// is no automatic retry, resending with a fresh id would duplicate the
	/// message.
	pub fn restore_draft(&mut self, draft: MessageDraft) {
		self.compose = draft;
	}

	fn insert_message(&mut self, message: ChatMessage) -> bool {
		if !self.seen_message_ids.insert(message.id) {
			return false;
		}

		let position = self
			.messages
			.partition_point(|existing| existing.sort_key() < message.sort_key());
		self.messages.insert(position, message);
		true
	}
}

fn join_request(room: &RoomKey) -> ClientRequest {
	match room {
		RoomKey::Order(order_id) => JoinOrderChatRequest { order_id: *order_id }.into(),
		RoomKey::User(user_id) => JoinUserNotificationsRequest { user_id: *user_id }.into(),
		RoomKey::AdminBroadcast => ClientRequest::JoinAdminNotifications,
	}
}
