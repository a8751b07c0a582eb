//! CLI definitions for LightPilot.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// LightPilot CLI.
#[derive(Parser)]
#[command(name = "lightpilot")]
#[command(about = "Page capture, streaming chat and agent automation")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "~/.lightpilot/config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Chat with the completion model
    Chat {
        /// Message to send
        text: String,

        /// HTML file whose content is attached to the message
        #[arg(long)]
        page: Option<PathBuf>,

        /// System prompt
        #[arg(long)]
        system: Option<String>,

        /// Wait for the whole reply instead of streaming it
        #[arg(long)]
        no_stream: bool,

        /// Model override
        #[arg(long)]
        model: Option<String>,
    },

    /// Extract keywords from a captured page
    Keywords {
        /// HTML file to analyse
        #[arg(long)]
        page: PathBuf,
    },

    /// Search recent posts
    Search {
        /// Search query
        query: String,

        /// Maximum number of posts
        #[arg(long, default_value_t = 10)]
        max_results: u32,
    },

    /// Open a page in a new tab and store its content
    Capture {
        /// Page URL
        url: String,
    },

    /// Open the agent page with a prompt and start the build
    Build {
        /// Prompt passed to the agent page
        prompt: String,
    },

    /// Inspect or edit persisted state
    State {
        #[command(subcommand)]
        action: Option<StateAction>,
    },
}

#[derive(Subcommand)]
pub(crate) enum StateAction {
    /// Print every stored record
    Show,

    /// Store the completion API key
    SetXaiKey {
        key: String,
    },

    /// Store the search bearer token
    SetXToken {
        token: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat() {
        let cli = Cli::try_parse_from([
            "lightpilot", "chat", "hello", "--page", "page.html", "--no-stream", "--model", "grok-2",
        ])
        .unwrap();
        match cli.command {
            Commands::Chat { text, page, no_stream, model, system } => {
                assert_eq!(text, "hello");
                assert_eq!(page, Some(PathBuf::from("page.html")));
                assert!(no_stream);
                assert_eq!(model.as_deref(), Some("grok-2"));
                assert!(system.is_none());
            }
            _ => panic!("Expected chat command"),
        }
    }

    #[test]
    fn test_parse_state_defaults_to_show() {
        let cli = Cli::try_parse_from(["lightpilot", "-c", "alt.toml", "state"]).unwrap();
        assert_eq!(cli.config, "alt.toml");
        assert!(matches!(cli.command, Commands::State { action: None }));

        let cli = Cli::try_parse_from(["lightpilot", "state", "set-xai-key", "k"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::State { action: Some(StateAction::SetXaiKey { ref key }) } if key == "k"
        ));
    }

    #[test]
    fn test_parse_search_default_limit() {
        let cli = Cli::try_parse_from(["lightpilot", "search", "rust"]).unwrap();
        assert!(matches!(cli.command, Commands::Search { max_results: 10, .. }));
    }

    #[test]
    fn test_parse_capture() {
        let cli = Cli::try_parse_from(["lightpilot", "capture", "https://example.com"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Capture { ref url } if url == "https://example.com"
        ));
        assert!(Cli::try_parse_from(["lightpilot", "capture"]).is_err());
    }
}
