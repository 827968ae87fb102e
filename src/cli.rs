use std::sync::Arc;

use clap::{Parser, Subcommand};
use inquire::Text;

use crate::agent::session::SessionManager;
use crate::service::assistant::{Assistant, ConversationState, WELCOME_TEXT};

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat loop.
    Chat,
    /// Handle a single utterance and print the reply.
    Once { text: String },
    /// Run the first-time Google login so later runs can go headless.
    Login,
}

pub async fn cli(assistant: Arc<Assistant>, sessions: Arc<dyn SessionManager>) {
    // Fine to panic here
    let cli = Cli::parse();
    match &cli.command {
        Commands::Chat => chat_loop(&assistant).await,
        Commands::Once { text } => {
            let mut state = ConversationState::default();
            println!("{}", assistant.handle_message(&mut state, text).await);
        }
        Commands::Login => match sessions.acquire().await {
            Ok(session) => {
                if let Err(e) = sessions.release(session).await {
                    println!("Failed to close the login session: {}", e);
                }
                println!("登录状态已保存，之后的运行可以直接使用。");
            }
            Err(e) => println!("Failed to log in: {}", e),
        },
    }
}

async fn chat_loop(assistant: &Assistant) {
    println!("{}", WELCOME_TEXT);
    let mut state = ConversationState::default();
    loop {
        let line = match tokio::task::spawn_blocking(|| Text::new("请输入日程:").prompt()).await {
            Ok(Ok(line)) => line,
            // Escape / EOF ends the conversation.
            _ => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        println!("{}", assistant.handle_message(&mut state, &line).await);
    }
}
