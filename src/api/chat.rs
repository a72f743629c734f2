//! Assistant chat API
//!
//! This module provides the chat transcript session and an interactive terminal
//! loop on top of it.

use super::backend::ChatBackend;
use crate::error::{FormularyError, Result};
use crate::models::ChatMessage;
use std::io::{self, Write};

/// Conversation with the backend assistant
///
/// The backend is stateless: every turn sends the full transcript.
pub struct ChatSession<'a, B: ChatBackend + ?Sized> {
    backend: &'a B,
    transcript: Vec<ChatMessage>,
}

impl<'a, B: ChatBackend + ?Sized> ChatSession<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn clear(&mut self) {
        self.transcript.clear();
    }

    /// Send one user turn and return the assistant's reply
    ///
    /// Blank input is ignored and yields `Ok(None)`. When the request fails the
    /// user's message stays in the transcript.
    pub async fn send(&mut self, input: &str) -> Result<Option<String>> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        self.transcript.push(ChatMessage::user(input));
        let reply = self.backend.send_transcript(&self.transcript).await?;
        self.transcript.push(ChatMessage::assistant(reply.clone()));
        Ok(Some(reply))
    }
}

/// Interactive chat session on stdin/stdout
///
/// Supports `help`, `history`, `clear` and `exit`/`quit`.
pub async fn chat_interactive<B: ChatBackend + ?Sized>(backend: &B) -> Result<()> {
    let mut session = ChatSession::new(backend);

    println!("💬 Assistant chat");
    println!("   Type 'help' for commands, 'exit' to quit");
    println!("{}", "-".repeat(50));

    loop {
        print!("\nYou: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye!");
                break;
            }
            "help" => {
                println!("\nCommands:");
                println!("  history   - Show the conversation so far");
                println!("  clear     - Clear conversation history");
                println!("  help      - Show this help");
                println!("  exit/quit - End session");
                continue;
            }
            "history" => {
                for message in session.transcript() {
                    println!("{:?}: {}", message.role, message.content);
                }
                continue;
            }
            "clear" => {
                session.clear();
                println!("Conversation history cleared.");
                continue;
            }
            _ => {}
        }

        let start_time = std::time::Instant::now();
        match session.send(input).await {
            Ok(Some(reply)) => {
                println!("\nAssistant: {}", reply);
                println!("[{:.1}s]", start_time.elapsed().as_secs_f64());
            }
            Ok(None) => {}
            Err(e @ FormularyError::Http { .. }) | Err(e @ FormularyError::Network(_)) => {
                log::warn!("Chat request failed: {}", e);
                println!("❌ Could not get a reply: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}
