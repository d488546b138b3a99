use clap::Parser;

use sift_ingest::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	sift_ingest::run(args).await
}
