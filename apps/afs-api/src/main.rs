use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = afs_api::Args::parse();

	afs_api::run(args).await
}
