use crate::configuration::ConfigurationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrderchatError {
	#[error("Failed to load configuration: {0}")]
	Configuration(#[from] ConfigurationError),
	#[error("Invalid log filters: {0}")]
	LogFilters(#[from] tracing_subscriber::filter::ParseError),
	#[error("Failed to parse commandline: {0}")]
	Commandline(#[from] clap::Error),
	#[error("IO error while serving requests: {0}")]
	Server(#[from] std::io::Error),
}
