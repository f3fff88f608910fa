use crate::identity::UserId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl From<Uuid> for OrderId {
	fn from(uuid: Uuid) -> Self {
		OrderId(uuid)
	}
}

impl From<OrderId> for Uuid {
	fn from(order_id: OrderId) -> Self {
		order_id.0
	}
}

impl Display for OrderId {
	fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
		write!(formatter, "{}", self.0)
	}
}

/// The slice of an order the realtime layer needs: who owns it and the
/// human-readable number used in notifications.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderSummary {
	pub order_id: OrderId,
	pub order_number: String,
	pub customer_id: UserId,
}

/// Order ownership resolution, backed by the hosting storefront's REST API.
#[async_trait]
pub trait OrderDirectory: Send + Sync {
	async fn lookup(&self, order_id: OrderId) -> Result<Option<OrderSummary>, DirectoryError>;
}

#[derive(Error, Debug)]
pub enum DirectoryError {
	#[error("Order lookup request failed: {0}")]
	Http(#[from] reqwest::Error),
	#[error("Order lookup returned unexpected status: {0}")]
	UnexpectedStatus(reqwest::StatusCode),
}

pub struct HttpOrderDirectory {
	client: reqwest::Client,
	base_url: String,
}

impl HttpOrderDirectory {
	pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
		Self {
			client,
			base_url: base_url.into(),
		}
	}
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
	id: OrderId,
	order_number: String,
	customer_id: UserId,
}

impl From<OrderResponse> for OrderSummary {
	fn from(response: OrderResponse) -> Self {
		Self {
			order_id: response.id,
			order_number: response.order_number,
			customer_id: response.customer_id,
		}
	}
}

#[async_trait]
impl OrderDirectory for HttpOrderDirectory {
	async fn lookup(&self, order_id: OrderId) -> Result<Option<OrderSummary>, DirectoryError> {
		let url = format!("{}/orders/{order_id}", self.base_url);
		let response = self.client.get(url).send().await?;

		if response.status() == reqwest::StatusCode::NOT_FOUND {
			return Ok(None);
		}
		if !response.status().is_success() {
			return Err(DirectoryError::UnexpectedStatus(response.status()));
		}

		let order: OrderResponse = response.json().await?;
		Ok(Some(order.into()))
	}
}

#[cfg(test)]
pub mod test_utils {
	use super::*;
	use std::collections::HashMap;

	#[derive(Default)]
	pub struct InMemoryOrderDirectory {
		orders: parking_lot::Mutex<HashMap<OrderId, OrderSummary>>,
	}

	impl InMemoryOrderDirectory {
		pub fn insert(&self, order: OrderSummary) {
			self.orders.lock().insert(order.order_id, order);
		}
	}

	#[async_trait]
	impl OrderDirectory for InMemoryOrderDirectory {
		async fn lookup(&self, order_id: OrderId) -> Result<Option<OrderSummary>, DirectoryError> {
			Ok(self.orders.lock().get(&order_id).cloned())
		}
	}
}

#[cfg(test)]
pub use test_utils::InMemoryOrderDirectory;
