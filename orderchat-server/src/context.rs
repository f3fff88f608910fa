use crate::chat::api::ChatApi;
use crate::configuration::Configuration;
use crate::notifier::NotificationFanout;
use crate::orders::OrderDirectory;
use crate::registry::ConnectionRegistry;
use crate::relay::MessageRelay;
use crate::router::RoomRouter;
use crate::utils::time_source::TimeSource;
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone, FromRef)]
pub struct ApplicationContext {
	pub configuration: Configuration,
	pub time_source: TimeSource,
	pub registry: Arc<ConnectionRegistry>,
	pub router: Arc<RoomRouter>,
	pub relay: Arc<MessageRelay>,
	pub notifier: Arc<NotificationFanout>,
}

impl ApplicationContext {
	pub fn new(
		configuration: Configuration,
		time_source: TimeSource,
		chat_api: Arc<dyn ChatApi>,
		order_directory: Arc<dyn OrderDirectory>,
	) -> ApplicationContext {
		let registry = Arc::new(ConnectionRegistry::default());
		let router = Arc::new(RoomRouter::new(registry.clone(), order_directory.clone()));
		let notifier = Arc::new(NotificationFanout::new(registry.clone()));
		let relay = Arc::new(MessageRelay::new(
			registry.clone(),
			chat_api,
			order_directory,
			notifier.clone(),
		));

		Self {
			configuration,
			time_source,
			registry,
			router,
			relay,
			notifier,
		}
	}
}
