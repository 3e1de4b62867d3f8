use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info};

use idea4gift::chat::{self, ChatServices};
use idea4gift::constants::DEFAULT_PORT;
use idea4gift::generation::GiftClient;
use idea4gift::store::{GiftSearchStore, HttpRecordStore, LogStore};
use idea4gift::uploads::LocalPhotoStore;
use idea4gift::{web_server, AppConfig, Language};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the gift wizard web UI.
    Start {
        #[arg(long, env = "IDEA4GIFT_PORT", default_value_t = DEFAULT_PORT, help = "Port for the web server.")]
        port: u16,
        #[arg(long, env = "IDEA4GIFT_LANGUAGE", value_enum, default_value = "en", help = "Conversation language.")]
        language: Language,
    },
    /// Run the gift wizard in the terminal.
    Chat {
        #[arg(long, env = "IDEA4GIFT_LANGUAGE", value_enum, default_value = "en", help = "Conversation language.")]
        language: Language,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for environment variables like API keys)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g., RUST_LOG=info,idea4gift=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("Idea4Gift starting with command: {:?}", cli.command);

    match cli.command {
        Commands::Start { port, language } => {
            let config = AppConfig::from_env().with_language(language);
            if config.api_key.is_empty() {
                error!("OPENROUTER_API_KEY is not set; gift generation will fail");
            }

            let mut web_server_handle = tokio::spawn(web_server::start_web_server(config, port));

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, initiating shutdown...");
                }
                res = &mut web_server_handle => {
                    match res {
                        Ok(Ok(())) => info!("Web server task completed unexpectedly."),
                        Ok(Err(e)) => error!("Web server failed: {:?}", e),
                        Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                        Err(e) => error!("Web server task failed: {:?}", e),
                    }
                }
            }

            if !web_server_handle.is_finished() {
                info!("Aborting web server task...");
                web_server_handle.abort();
            }
            info!("Shutdown complete.");
        }
        Commands::Chat { language } => {
            let config = AppConfig::from_env().with_language(language);
            let generator = GiftClient::from_config(&config);
            let store: Box<dyn GiftSearchStore> = match &config.store_url {
                Some(url) => Box::new(HttpRecordStore::new(url.clone())),
                None => Box::new(LogStore),
            };
            let photos = LocalPhotoStore::new(config.upload_dir.clone(), config.upload_dir.display().to_string());

            let services = ChatServices { generator: &generator, store: store.as_ref(), photos: &photos };
            chat::run_gift_chat(language, services, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await
                .context("Chat session failed")?;
            info!("Chat session finished.");
        }
    }

    Ok(())
}
