use crate::connection::receiver::{MessageReceiver, StreamMessageReceiver};
use crate::connection::sender::{MessageSender, SinkMessageSender};
use crate::message::WebSocketMessage;
use crate::message::client_request::{ClientRequest, ClientRequestWithId};
use crate::message::outgoing::OutgoingMessage;
use crate::message::outgoing::error_message::ErrorMessage;
use crate::message::outgoing::event_message::EventMessage;
use crate::message::outgoing::success_message::SuccessMessage;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::pin::Pin;

/// In-memory stand-in for a browser tab: the server half talks to returned
/// sender/receiver, the test drives the client half through this struct.
pub struct WebsocketTestClient {
	sender: Pin<Box<dyn Sink<WebSocketMessage, Error = ()> + Unpin + Send>>,
	receiver: Pin<Box<dyn Stream<Item = WebSocketMessage> + Unpin + Send>>,
}

impl WebsocketTestClient {
	pub fn new() -> (MessageSender, MessageReceiver, Self) {
		let (client_sender, server_receiver) = futures_channel::mpsc::unbounded();
		let (server_sender, client_receiver) = futures_channel::mpsc::unbounded();
		let client_sender = client_sender.sink_map_err(|_error| ());

		let sink_message_sender = SinkMessageSender::new(server_sender);
		let message_sender = MessageSender::from(sink_message_sender);
		let stream_message_receiver = StreamMessageReceiver::new(server_receiver, message_sender.clone());

		let message_receiver = MessageReceiver::from(stream_message_receiver);

		let test_client = Self {
			sender: Box::pin(client_sender),
			receiver: Box::pin(client_receiver),
		};

		(message_sender, message_receiver, test_client)
	}

	pub async fn send_raw(&mut self, message: WebSocketMessage) {
		self.sender
			.send(message)
			.await
			.expect("Failed to send message via TestClient.");
	}

	pub async fn receive_raw(&mut self) -> WebSocketMessage {
		self.receiver
			.next()
			.await
			.expect("Failed to receive message via TestClient")
	}

	pub async fn send_request(&mut self, request: impl Into<ClientRequest>) -> u64 {
		let request_id = rand::random();
		self.send_request_with_id(request, request_id).await;
		request_id
	}

	pub async fn send_request_with_id(&mut self, request: impl Into<ClientRequest>, request_id: u64) {
		let client_request = ClientRequestWithId {
			request_id,
			request: request.into(),
		};
		let websocket_message = WebSocketMessage::from(&client_request);
		self.send_raw(websocket_message).await;
	}

	pub async fn receive_success_message(&mut self, expected_request_id: u64) -> SuccessMessage {
		let websocket_message = self.receive_raw().await;
		match OutgoingMessage::try_from(&websocket_message).expect("Failed to deserialize OutgoingMessage") {
			OutgoingMessage::Success { request_id, message } => {
				assert_eq!(request_id, expected_request_id);
				message
			}
			message => panic!("Received message with incorrect type: {message:?}"),
		}
	}

	pub async fn receive_error_message(&mut self, expected_request_id: Option<u64>) -> ErrorMessage {
		let websocket_message = self.receive_raw().await;
		match OutgoingMessage::try_from(&websocket_message).expect("Failed to deserialize OutgoingMessage") {
			OutgoingMessage::Error { request_id, message } => {
				assert_eq!(request_id, expected_request_id);
				message
			}
			message => panic!("Received message with incorrect type: {message:?}"),
		}
	}

	pub async fn receive_event_message(&mut self) -> EventMessage {
		let websocket_message = self.receive_raw().await;
		match OutgoingMessage::try_from(&websocket_message).expect("Failed to deserialize OutgoingMessage") {
			OutgoingMessage::Event { message } => message,
			message => panic!("Received message with incorrect type: {message:?}"),
		}
	}

	pub async fn receive_ping(&mut self) -> Vec<u8> {
		let websocket_message = self.receive_raw().await;
		match websocket_message {
			WebSocketMessage::Ping(payload) => payload.to_vec(),
			message => panic!("Received message with incorrect type: {message:?}"),
		}
	}

	pub async fn send_pong(&mut self, payload: Vec<u8>) {
		self.send_raw(WebSocketMessage::Pong(payload.into())).await;
	}
}
