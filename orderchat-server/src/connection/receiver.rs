use crate::connection::sender::MessageSender;
use crate::message::client_request::{ClientRequestWithId, RequestIdOnly};
use crate::message::outgoing::error_message::{ErrorMessage, ErrorMessageType};
use crate::message::{MessageError, WebSocketMessage};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use tracing::error;

pub type MessageReceiver = Pin<Box<dyn MessageReceiverTrait + Unpin + Send>>;

#[derive(Debug)]
pub enum ReceivedMessage {
	Request(ClientRequestWithId),
	Pong { payload: Vec<u8> },
	Finished,
}

#[async_trait]
pub trait MessageReceiverTrait {
	/// Receive the next client message, or `Finished` once the connection is
	/// gone.
	async fn receive(&mut self) -> ReceivedMessage;
}

pub struct StreamMessageReceiver<RequestStream> {
	request_stream: RequestStream,
	message_sender: MessageSender,
}

#[async_trait]
impl<RequestStream> MessageReceiverTrait for StreamMessageReceiver<RequestStream>
where
	RequestStream: Stream<Item = WebSocketMessage> + Unpin + Send,
{
	async fn receive(&mut self) -> ReceivedMessage {
		const MAXIMUM_RETRIES: usize = 10;

		for _ in 0..MAXIMUM_RETRIES {
			let websocket_message = match self.request_stream.next().await {
				Some(websocket_message) => websocket_message,
				None => return ReceivedMessage::Finished,
			};

			match &websocket_message {
				WebSocketMessage::Close(_) => {
					self.message_sender.close().await;
					return ReceivedMessage::Finished;
				}
				WebSocketMessage::Pong(payload) => {
					return ReceivedMessage::Pong {
						payload: payload.to_vec(),
					};
				}
				// the transport answers pings on its own
				WebSocketMessage::Ping(_) => continue,
				_ => {}
			}

			let client_request = match ClientRequestWithId::try_from(&websocket_message) {
				Ok(client_request) => client_request,
				Err(message_error) => {
					let request_id = RequestIdOnly::try_from(&websocket_message)
						.map(|request| request.request_id)
						.ok();
					let message = match message_error {
						MessageError::DeserializationFailed { error, json } => format!(
							"Failed to deserialize client message with error: {error}, message was: {json}"
						),
						MessageError::WrongMessageType(message) => {
							format!("Client request has incorrect message type. Message was: {message:?}")
						}
					};
					error!("{message}");
					let _ = self
						.message_sender
						.send_error_message(
							ErrorMessage::builder()
								.error(ErrorMessageType::InvalidFormat)
								.message(message)
								.build(),
							request_id,
						)
						.await;
					continue;
				}
			};

			return ReceivedMessage::Request(client_request);
		}

		let _ = self
			.message_sender
			.send_error_message(
				ErrorMessage::builder()
					.error(ErrorMessageType::InvalidOperation)
					.message("Too many retries".to_string())
					.build(),
				None,
			)
			.await;
		self.message_sender.close().await;
		ReceivedMessage::Finished
	}
}

impl<RequestStream> StreamMessageReceiver<RequestStream>
where
	RequestStream: Stream<Item = WebSocketMessage>,
{
	pub fn new(request_stream: RequestStream, message_sender: MessageSender) -> Self {
		Self {
			request_stream,
			message_sender,
		}
	}
}

impl<RequestStream> From<StreamMessageReceiver<RequestStream>> for MessageReceiver
where
	RequestStream: Stream<Item = WebSocketMessage> + Unpin + Send + 'static,
{
	fn from(stream_message_receiver: StreamMessageReceiver<RequestStream>) -> Self {
		Box::pin(stream_message_receiver)
	}
}
