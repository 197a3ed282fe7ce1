use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = brew_api::Args::parse();
	brew_api::run(args).await
}
