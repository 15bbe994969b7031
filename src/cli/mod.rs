//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::debug;

use crate::api::client::ServiceClient;
use crate::auth::{self, SessionVault};
use crate::core::capability::{billing_label, picker_label};
use crate::core::collaborators::{ConsoleNotifier, SystemClipboard, TerminalRedirect};
use crate::core::config::Config;
use crate::core::conversations::ConversationStore;
use crate::core::session::{SessionParameters, SessionState};
use crate::core::snapshot::render::{RenderNode, StyleElement};
use crate::core::snapshot::SnapshotPublisher;
use crate::utils::logging::init_tracing;

#[derive(Parser)]
#[command(name = "devochat")]
#[command(about = "Manage chat sessions and publish shareable snapshots")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the service API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Log debug output to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in; the password is read from stdin
    Login { email: String },
    /// Create an account; the password is read from stdin
    Register { name: String, email: String },
    /// Forget the stored session
    Logout,
    /// List conversations
    Conversations {
        /// Show only starred conversations
        #[arg(long)]
        starred: bool,
    },
    /// List models that can be selected
    Models {
        /// Only models that accept image input
        #[arg(long)]
        image: bool,
    },
    /// Publish a captured transcript and copy its public link
    Share {
        /// JSON capture file with `content` and `styles`
        capture: PathBuf,
        /// Title shown on the shared page
        #[arg(short, long, default_value = "")]
        title: String,
    },
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    Set { key: String, value: String },
    Unset { key: String },
}

/// On-disk form of a transcript capture.
#[derive(Deserialize)]
struct CaptureFile {
    content: Option<RenderNode>,
    #[serde(default)]
    styles: Vec<StyleElement>,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);
    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    let base_url = args.api_url.clone().unwrap_or_else(|| config.api_base_url());
    let vault = SessionVault::new(&base_url);
    debug!(%base_url, "resolved service");

    match args.command {
        Commands::Login { email } => {
            let password = read_secret("Password: ")?;
            let client = ServiceClient::new(&base_url, None);
            match auth::login(&client, &vault, &email, &password).await {
                Ok(_) => println!("✅ Logged in"),
                Err(err) => fail(&err.user_message()),
            }
        }
        Commands::Register { name, email } => {
            let password = read_secret("Password: ")?;
            let client = ServiceClient::new(&base_url, None);
            match auth::register(&client, &name, &email, &password).await {
                Ok(()) => println!("✅ Account created. You can now log in."),
                Err(err) => fail(&err.user_message()),
            }
        }
        Commands::Logout => {
            auth::logout(&vault)?;
            println!("✅ Logged out");
        }
        Commands::Conversations { starred } => {
            let client = ServiceClient::new(&base_url, vault.load()?);
            let store = ConversationStore::new();
            store.fetch_all(&client).await;
            if let Some(error) = store.error() {
                fail(&error);
            }
            for conv in store.conversations() {
                if starred && !conv.starred {
                    continue;
                }
                let star = if conv.starred { "★" } else { " " };
                println!("{star} {}  {}", conv.conversation_id, conv.alias);
            }
        }
        Commands::Models { image } => {
            let client = ServiceClient::new(&base_url, vault.load()?);
            let catalog = match client.fetch_models().await {
                Ok(catalog) => catalog,
                Err(err) => fail(&err.user_message()),
            };
            let mut session = SessionState::new(catalog, SessionParameters::from_config(&config));
            session.set_has_image(image);
            println!("Current: {}", session.current_model_alias());
            for model in session.eligible_models() {
                println!("  {} ({})", picker_label(model), model.model_name);
                if !model.description.is_empty() {
                    println!("      {}", model.description);
                }
                println!("      {}", billing_label(model));
            }
        }
        Commands::Share { capture, title } => {
            let raw = std::fs::read_to_string(&capture)?;
            let capture: CaptureFile = serde_json::from_str(&raw)?;
            let client = ServiceClient::new(&base_url, vault.load()?);
            let publisher = SnapshotPublisher::new(
                Arc::new(client),
                Arc::new(SystemClipboard),
                Arc::new(ConsoleNotifier),
                Arc::new(TerminalRedirect::new("/share")),
                config.share_domain(),
                config.sanitize_classes(),
            );
            match publisher
                .publish(capture.content.as_ref(), &capture.styles, &title)
                .await
            {
                Ok(receipt) => println!("{}", receipt.url),
                Err(err) => fail(&err.to_string()),
            }
        }
        Commands::Config { action } => match action {
            None => config.print_all(),
            Some(ConfigAction::Set { key, value }) => {
                if let Err(err) = config.set_value(&key, &value) {
                    fail(&err);
                }
                config.save()?;
                println!("✅ Set {key} to: {value}");
            }
            Some(ConfigAction::Unset { key }) => {
                if let Err(err) = config.unset_value(&key) {
                    fail(&err);
                }
                config.save()?;
                println!("✅ Unset {key}");
            }
        },
    }
    Ok(())
}

fn read_secret(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn fail(message: &str) -> ! {
    eprintln!("❌ {message}");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_share_command() {
        let args = Args::try_parse_from(["devochat", "share", "cap.json", "--title", "Hello"])
            .expect("parse");
        match args.command {
            Commands::Share { capture, title } => {
                assert_eq!(capture, PathBuf::from("cap.json"));
                assert_eq!(title, "Hello");
            }
            _ => panic!("expected share"),
        }
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let args = Args::try_parse_from(["devochat", "models", "--image", "--api-url", "http://x"])
            .expect("parse");
        assert_eq!(args.api_url.as_deref(), Some("http://x"));
        assert!(matches!(args.command, Commands::Models { image: true }));
    }

    #[test]
    fn capture_file_allows_missing_styles() {
        let capture: CaptureFile = serde_json::from_str(
            r#"{"content": {"type": "element", "tag": "div", "children": []}}"#,
        )
        .unwrap();
        assert!(capture.content.is_some());
        assert!(capture.styles.is_empty());
    }
}
