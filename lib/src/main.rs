use clap::Parser;
use cropdoc::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let config = Config::parse();
	cropdoc::init_tracing();

	cropdoc::start(config).await
}
