use clap::Parser;
use orderchat_server::commandline::Commandline;
use orderchat_server::error::OrderchatError;

#[tokio::main]
async fn main() -> Result<(), OrderchatError> {
	Commandline::parse().run().await
}
