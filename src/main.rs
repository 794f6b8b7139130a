//! chatcast binary entry point.

use chatcast::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatcast=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve(args) => chatcast::cli::handle_serve(config, args).await,
        Commands::Chat(args) => {
            let mut stdout = std::io::stdout().lock();
            match chatcast::cli::handle_chat(config, args, &mut stdout).await {
                Ok(true) => Ok(()),
                Ok(false) => std::process::exit(2),
                Err(e) => Err(e),
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
