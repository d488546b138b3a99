use clap::Parser;

use sift_api::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	sift_api::run(args).await
}
