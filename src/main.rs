use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use chatbot::{Commands, Container, ContainerConfig, Router};

#[derive(Parser)]
#[command(name = "chatbot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Answer with an offline echo provider instead of calling OpenAI
    #[arg(long, global = true)]
    mock_provider: bool,

    /// Model name, overriding OPENAI_MODEL
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    // Logs go to stderr so streamed answers on stdout stay clean.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let container = Container::new(ContainerConfig {
        mock_provider: cli.mock_provider,
        model: cli.model,
    })?;

    let output = Router::new(&container).route(cli.command).await?;
    if !output.is_empty() {
        println!("{}", output);
    }

    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn global_flags_apply_to_subcommands() {
        let cli = Cli::try_parse_from(["chatbot", "ask", "hello", "--mock-provider", "-v"])
            .expect("valid arguments");
        assert!(cli.mock_provider);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Ask { ref message, .. } if message == "hello"));
    }

    #[test]
    fn serve_defaults_to_local_port_3000() {
        let cli = Cli::try_parse_from(["chatbot", "serve"]).expect("valid arguments");
        assert!(matches!(
            cli.command,
            Commands::Serve {
                port: 3000,
                public: false
            }
        ));
    }

    #[test]
    fn attach_is_repeatable() {
        let cli = Cli::try_parse_from(["chatbot", "chat", "-a", "a.txt", "--attach", "b.pdf"])
            .expect("valid arguments");
        match cli.command {
            Commands::Chat { attach, server } => {
                assert_eq!(attach, vec!["a.txt", "b.pdf"]);
                assert!(server.is_none());
            }
            _ => panic!("expected chat command"),
        }
    }
}
