use crate::chat::api::HttpChatApi;
use crate::configuration::Configuration;
use crate::context::ApplicationContext;
use crate::error::OrderchatError;
use crate::orders::HttpOrderDirectory;
use crate::server::run_server;
use crate::utils::time_source::TimeSource;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(clap::Parser)]
pub struct Commandline {
	#[clap(short = 'c', long = "config-file", default_value = "configuration.toml")]
	pub configuration_file_path: String,
	#[clap(subcommand)]
	pub command: Option<BaseCommand>,
}

#[derive(clap::Parser)]
pub enum BaseCommand {
	/// Run the orderchat server
	Run,
	/// Print the configuration
	Configuration,
}

impl Default for BaseCommand {
	fn default() -> Self {
		Self::Run
	}
}

impl Commandline {
	pub async fn run(self) -> Result<(), OrderchatError> {
		let configuration = Configuration::from_file(&self.configuration_file_path)?;

		tracing_subscriber::fmt()
			.with_env_filter(EnvFilter::try_new(&configuration.log_filters)?)
			.init();

		let client = reqwest::Client::builder()
			.timeout(configuration.api_request_timeout)
			.build()
			.expect("Failed to construct HTTP client.");
		let chat_api = Arc::new(HttpChatApi::new(client.clone(), &configuration.storefront_api_url));
		let order_directory = Arc::new(HttpOrderDirectory::new(client, &configuration.storefront_api_url));

		let application_context =
			ApplicationContext::new(configuration, TimeSource::default(), chat_api, order_directory);

		let base_command = self.command.unwrap_or_default();
		match base_command {
			BaseCommand::Run => {
				info!(
					"Starting server. Start websocket connections at 'ws://{}/ws'.",
					application_context.configuration.address
				);
				run_server(application_context).await?;
			}
			BaseCommand::Configuration => println!("{:?}", application_context.configuration),
		}
		Ok(())
	}
}
