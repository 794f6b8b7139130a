//! CLI entry point for chatcast.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures::StreamExt;

use crate::compose::{GatewayServices, ServiceFactory, StreamFrame};
use crate::config::ChatcastConfig;
use crate::error::Result;
use crate::server::{AppState, HttpServer};
use crate::types::UiMessage;
use crate::writer::spawn_turn;

/// chatcast streaming chat backend
#[derive(Parser, Debug)]
#[command(name = "chatcast", version, about = "Streaming chat backend")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Compose one turn locally and print each chunk as a JSON line
    Chat(ChatArgs),
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Gateway API key (defaults to AI_GATEWAY_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Start weather and suggestion calls alongside the model stream
    #[arg(long)]
    pub prefetch: bool,

    /// User prompt
    pub prompt: String,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn load_config(&self) -> Result<ChatcastConfig> {
        ChatcastConfig::load(self.config.as_deref())
    }
}

pub async fn handle_serve(mut config: ChatcastConfig, args: ServeArgs) -> Result<()> {
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    HttpServer::new(AppState::new(config)).run().await
}

/// Writes frames to `out` as they arrive. Returns false when the turn ended
/// with an error.
pub async fn handle_chat(mut config: ChatcastConfig, args: ChatArgs, out: &mut impl Write) -> Result<bool> {
    if args.prefetch {
        config.prefetch_side_queries = true;
    }
    let budget = config.turn_budget();
    let composer = GatewayServices::new(config).composer(args.api_key.as_deref())?;

    let mut frames = spawn_turn(composer, vec![UiMessage::user(args.prompt)], budget);
    let mut ok = true;
    while let Some(frame) = frames.next().await {
        if matches!(frame, StreamFrame::Error(_)) {
            ok = false;
        }
        writeln!(out, "{}", frame.sse_data())?;
        out.flush()?;
    }
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve_overrides() {
        let cli = Cli::try_parse_from(["chatcast", "serve", "--host", "0.0.0.0", "-p", "8080"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
                assert_eq!(args.port, Some(8080));
            }
            other => panic!("expected Serve, got {other:?}"),
        }
    }

    #[test]
    fn parse_chat_with_options() {
        let cli = Cli::try_parse_from([
            "chatcast",
            "chat",
            "--api-key",
            "k",
            "--prefetch",
            "Weather in Laval?",
            "--config",
            "chatcast.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("chatcast.toml")));
        match cli.command {
            Commands::Chat(args) => {
                assert_eq!(args.api_key.as_deref(), Some("k"));
                assert!(args.prefetch);
                assert_eq!(args.prompt, "Weather in Laval?");
            }
            other => panic!("expected Chat, got {other:?}"),
        }
    }

    #[test]
    fn parse_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["chatcast"]).is_err());
    }

    #[test]
    fn parse_chat_requires_prompt() {
        assert!(Cli::try_parse_from(["chatcast", "chat"]).is_err());
    }

    #[tokio::test]
    async fn chat_without_credential_ends_with_the_gateway_error() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": {"message": "Invalid API key"}})),
            )
            .mount(&server)
            .await;
        let config = ChatcastConfig {
            gateway_base_url: Some(server.uri()),
            weather_base_url: Some(server.uri()),
            ..ChatcastConfig::default()
        };
        let args = ChatArgs {
            api_key: None,
            prefetch: false,
            prompt: "hi".into(),
        };

        let mut out = Vec::new();
        assert!(!handle_chat(config, args, &mut out).await.unwrap());

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].contains("data-notification"));
        assert_eq!(
            lines.last().copied(),
            Some(r#"{"type":"error","errorText":"Authentication error: Invalid API key"}"#)
        );
        assert!(!text.contains("[DONE]"));
    }
}
