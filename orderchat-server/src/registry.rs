use crate::message::outgoing::event_message::EventMessage;
use crate::registry::connection_id::ConnectionId;
use crate::registry::room_key::RoomKey;
use crate::utils::atomic_sequence::AtomicSequence;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::mpsc;

pub mod connection_id;
pub mod room_key;

/// Per-connection handle for pushing events towards its websocket. Events are
/// enqueued synchronously and pumped to the sink by the connection's own task.
pub type EventSender = mpsc::UnboundedSender<EventMessage>;

/// Tracks live connections and their room memberships in both directions:
/// fan-out needs all members of a room, teardown needs all rooms of a
/// connection. The single mutex is fine at this scale; events are enqueued
/// while holding it, which makes every member observe one room's events in
/// the same order.
#[derive(Default)]
pub struct ConnectionRegistry {
	connection_id_sequence: AtomicSequence,
	index: parking_lot::Mutex<Index>,
}

#[derive(Default)]
struct Index {
	connections: HashMap<ConnectionId, Connection>,
	members_by_room: HashMap<RoomKey, BTreeSet<ConnectionId>>,
}

struct Connection {
	event_sender: EventSender,
	rooms: BTreeSet<RoomKey>,
}

impl ConnectionRegistry {
	/// Register a new connection, passing in the sender for its event queue.
	pub fn register(&self, event_sender: EventSender) -> ConnectionId {
		let connection_id = ConnectionId::from(self.connection_id_sequence.next());
		let connection = Connection {
			event_sender,
			rooms: BTreeSet::new(),
		};

		let mut index = self.index.lock();
		if index.connections.insert(connection_id, connection).is_some() {
			unreachable!("There must never be two connections with the same id!");
		}

		connection_id
	}

	/// Remove the connection from every room it is a member of. Idempotent;
	/// an unknown connection is a no-op.
	pub fn unregister(&self, connection_id: ConnectionId) {
		let index = &mut *self.index.lock();
		let Some(connection) = index.connections.remove(&connection_id) else {
			return;
		};

		for room in connection.rooms {
			remove_member(&mut index.members_by_room, &room, connection_id);
		}
	}

	/// Add a room membership. Membership never outlives the connection: joins
	/// for connections that have already disconnected are dropped.
	pub fn join(&self, connection_id: ConnectionId, room: RoomKey) {
		let index = &mut *self.index.lock();
		let Some(connection) = index.connections.get_mut(&connection_id) else {
			return;
		};

		if connection.rooms.insert(room) {
			index.members_by_room.entry(room).or_default().insert(connection_id);
		}
	}

	/// Remove a single room membership. Idempotent.
	pub fn leave(&self, connection_id: ConnectionId, room: &RoomKey) {
		let index = &mut *self.index.lock();
		let Some(connection) = index.connections.get_mut(&connection_id) else {
			return;
		};

		if connection.rooms.remove(room) {
			remove_member(&mut index.members_by_room, room, connection_id);
		}
	}

	pub fn is_member(&self, connection_id: ConnectionId, room: &RoomKey) -> bool {
		let index = self.index.lock();
		index
			.connections
			.get(&connection_id)
			.is_some_and(|connection| connection.rooms.contains(room))
	}

	pub fn rooms_of(&self, connection_id: ConnectionId) -> BTreeSet<RoomKey> {
		let index = self.index.lock();
		index
			.connections
			.get(&connection_id)
			.map(|connection| connection.rooms.clone())
			.unwrap_or_default()
	}

	pub fn members_of(&self, room: &RoomKey) -> BTreeSet<ConnectionId> {
		let index = self.index.lock();
		index.members_by_room.get(room).cloned().unwrap_or_default()
	}

	/// Enqueue an event for every member of a room, returning how many queues
	/// accepted it. Members whose pump task has already gone away are skipped.
	pub fn broadcast(&self, room: &RoomKey, event: &EventMessage) -> usize {
		let index = self.index.lock();
		let Some(members) = index.members_by_room.get(room) else {
			return 0;
		};

		let mut delivered = 0;
		for connection in members
			.iter()
			.filter_map(|connection_id| index.connections.get(connection_id))
		{
			if connection.event_sender.send(event.clone()).is_ok() {
				delivered += 1;
			}
		}
		delivered
	}
}

fn remove_member(
	members_by_room: &mut HashMap<RoomKey, BTreeSet<ConnectionId>>,
	room: &RoomKey,
	connection_id: ConnectionId,
) {
	if let Some(members) = members_by_room.get_mut(room) {
		members.remove(&connection_id);
		if members.is_empty() {
			members_by_room.remove(room);
		}
	}
}
