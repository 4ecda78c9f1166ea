//! `medtutor ask`: single-message or interactive chat from the terminal.
//!
//! Uses the same pipeline and database as the HTTP API, so a session started
//! here can be continued from the browser and the other way round.

use medtutor_chat::{ChatRequest, ChatService};
use medtutor_store::SqliteDatabase;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::load_config;

const CLI_USER: &str = "cli";

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let db = SqliteDatabase::open(&config.database.url, config.database.max_connections).await?;
    let provider = medtutor_providers::build_from_config(&config);
    let chat = ChatService::from_config(
        &config,
        provider,
        Arc::new(db.knowledge()),
        Arc::new(db.sessions()),
    );
    let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    tracing::debug!(session_id = %session_id, provider = chat.provider_name(), "Chat session ready");

    let result = match message {
        Some(msg) => ask_once(&chat, &session_id, msg).await,
        None => interactive(&chat, &session_id, config.llm.model()).await,
    };

    db.close().await;
    result
}

async fn ask_once(
    chat: &ChatService,
    session_id: &str,
    message: String,
) -> Result<(), Box<dyn std::error::Error>> {
    eprint!("  Thinking...");
    let reply = chat.send_message(request(session_id, message)).await;
    eprint!("\r              \r");
    let reply = reply?;

    println!("{}", reply.response);
    eprintln!();
    eprintln!("  [{}] session {}", reply.metadata.category, reply.session_id);
    Ok(())
}

async fn interactive(
    chat: &ChatService,
    session_id: &str,
    model: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("  MedTutor, interactive mode");
    println!();
    println!("  Provider:  {} ({model})", chat.provider_name());
    println!("  Session:   {session_id}");
    println!();
    println!("  Type a question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        eprint!("  ...");
        match chat.send_message(request(session_id, line.to_string())).await {
            Ok(reply) => {
                eprint!("\r     \r");
                println!();
                for text in reply.response.lines() {
                    println!("  Tutor > {text}");
                }
                println!();
                let follow_ups = reply.suggestions.join(" | ");
                println!("  Try: {follow_ups}");
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

fn request(session_id: &str, message: String) -> ChatRequest {
    ChatRequest {
        message,
        session_id: session_id.to_string(),
        user_id: Some(CLI_USER.to_string()),
    }
}
