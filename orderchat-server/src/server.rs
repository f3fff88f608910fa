use crate::connection::receiver::{MessageReceiver, StreamMessageReceiver};
use crate::connection::sender::{MessageSender, SinkMessageSender};
use crate::context::ApplicationContext;
use crate::identity::{Identity, UserId};
use crate::lifecycle::run_connection;
use crate::message::outgoing::event_message::OrderStatusUpdate;
use axum::Router;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use futures_util::StreamExt;
use serde::Deserialize;
use std::future::ready;
use tower_http::cors::CorsLayer;

pub async fn run_server(application_context: ApplicationContext) -> Result<(), std::io::Error> {
	let address = application_context.configuration.address;
	let router = create_router(application_context);
	axum_server::bind(address).serve(router.into_make_service()).await
}

pub fn create_router(application_context: ApplicationContext) -> Router {
	Router::new()
		.route("/ws", get(websocket_handler))
		.route("/api/order-status", post(order_status_handler))
		.layer(CorsLayer::permissive())
		.with_state(application_context)
}

/// The hosting application's auth layer terminates the session and passes
/// the verified identity along in the upgrade request.
async fn websocket_handler(
	State(application_context): State<ApplicationContext>,
	Query(identity): Query<Identity>,
	websocket: WebSocketUpgrade,
) -> Response {
	websocket.on_upgrade(move |websocket| handle_websocket(websocket, application_context, identity))
}

async fn handle_websocket(websocket: WebSocket, application_context: ApplicationContext, identity: Identity) {
	let (sink, stream) = websocket.split();

	let message_sender = MessageSender::from(SinkMessageSender::new(sink));
	let stream = stream
		.take_while(|result| ready(result.is_ok()))
		.filter_map(|result| ready(result.ok()));
	let message_receiver = MessageReceiver::from(StreamMessageReceiver::new(stream, message_sender.clone()));

	run_connection(application_context, identity, message_sender, message_receiver).await;
}

/// Called by the hosting CRUD application whenever it transitions an order,
/// so the owner's open tabs learn about it without reloading. The durable
/// notification record is written by the caller; this is push only.
#[derive(Deserialize)]
struct OrderStatusEvent {
	owner_user_id: UserId,
	order_number: String,
	status: String,
}

async fn order_status_handler(
	State(application_context): State<ApplicationContext>,
	axum::Json(event): axum::Json<OrderStatusEvent>,
) -> StatusCode {
	application_context.notifier.notify_order_status(
		event.owner_user_id,
		OrderStatusUpdate {
			order_number: event.order_number,
			status: event.status,
		},
	);
	StatusCode::NO_CONTENT
}
