use crate::message::WebSocketMessage;
use crate::message::outgoing::OutgoingMessage;
use crate::message::outgoing::error_message::ErrorMessage;
use crate::message::outgoing::event_message::EventMessage;
use crate::message::outgoing::success_message::SuccessMessage;
use async_trait::async_trait;
use futures_util::{Sink, SinkExt};
use std::fmt::Debug;
use std::pin::Pin;
use std::sync::Arc;
use tracing::error;

pub type MessageSender = Pin<Arc<dyn MessageSenderTrait + Send + Sync>>;

#[async_trait]
pub trait MessageSenderTrait {
	async fn send_success_message(&self, message: SuccessMessage, request_id: u64) -> Result<(), ()>;
	async fn send_error_message(&self, message: ErrorMessage, request_id: Option<u64>) -> Result<(), ()>;
	async fn send_event_message(&self, message: EventMessage) -> Result<(), ()>;
	async fn send_ping(&self, payload: Vec<u8>) -> Result<(), ()>;
	async fn close(&self);
}

pub struct SinkMessageSender<ResponseSink> {
	inner: tokio::sync::Mutex<ResponseSink>,
}

#[async_trait]
impl<ResponseSink, SinkError> MessageSenderTrait for SinkMessageSender<ResponseSink>
where
	ResponseSink: Sink<WebSocketMessage, Error = SinkError> + Send + Unpin + 'static,
	SinkError: Debug + 'static,
{
	async fn send_success_message(&self, message: SuccessMessage, request_id: u64) -> Result<(), ()> {
		let outgoing_message = OutgoingMessage::Success { request_id, message };
		self.send_message(outgoing_message).await
	}

	async fn send_error_message(&self, message: ErrorMessage, request_id: Option<u64>) -> Result<(), ()> {
		let outgoing_message = OutgoingMessage::Error { request_id, message };
		self.send_message(outgoing_message).await
	}

	async fn send_event_message(&self, message: EventMessage) -> Result<(), ()> {
		let outgoing_message = OutgoingMessage::Event { message };
		self.send_message(outgoing_message).await
	}

	async fn send_ping(&self, payload: Vec<u8>) -> Result<(), ()> {
		let mut response_sink = self.inner.lock().await;
		let ping = WebSocketMessage::Ping(payload.into());
		response_sink
			.send(ping)
			.await
			.map_err(|error| error!("Error while sending ping: {error:?}"))
	}

	async fn close(&self) {
		let mut response_sink = self.inner.lock().await;
		let _ = response_sink.send(WebSocketMessage::Close(None)).await;
	}
}

impl<ResponseSink, SinkError> SinkMessageSender<ResponseSink>
where
	ResponseSink: Sink<WebSocketMessage, Error = SinkError> + Unpin,
	SinkError: Debug + 'static,
{
	pub fn new(response_sink: ResponseSink) -> Self {
		Self {
			inner: response_sink.into(),
		}
	}

	async fn send_message(&self, message: OutgoingMessage) -> Result<(), ()> {
		let mut response_sink = self.inner.lock().await;

		let websocket_message = WebSocketMessage::from(&message);

		response_sink
			.send(websocket_message)
			.await
			.map_err(|error| error!("Error while sending message: {error:?}"))
	}
}

impl<ResponseSink, SinkError> From<SinkMessageSender<ResponseSink>> for MessageSender
where
	ResponseSink: Sink<WebSocketMessage, Error = SinkError> + Send + Unpin + 'static,
	SinkError: Debug + 'static,
{
	fn from(sink_message_sender: SinkMessageSender<ResponseSink>) -> Self {
		Arc::pin(sink_message_sender)
	}
}
