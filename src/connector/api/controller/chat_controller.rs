use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::application::{FileUploadService, PendingFile};
use crate::domain::{Attachment, Role};

use super::super::Container;
use super::transcript::send_and_render;

const HELP: &str = "\
Commands:
  /attach <path>   attach a file to the next message
  /files           list pending attachments
  /remove <id>     drop a pending attachment
  /clear           drop all pending attachments
  /help            show this help
  /quit            leave the conversation";

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Message(&'a str),
    Attach(&'a str),
    Files,
    Remove(&'a str),
    Clear,
    Help,
    Quit,
    Empty,
    Unknown(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Message(line);
        };
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match name {
            "attach" if !arg.is_empty() => Self::Attach(arg),
            "remove" if !arg.is_empty() => Self::Remove(arg),
            "files" => Self::Files,
            "clear" => Self::Clear,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(line),
        }
    }
}

pub struct ChatController<'a> {
    container: &'a Container,
}

impl<'a> ChatController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// Runs an interactive conversation on stdin/stdout.
    pub async fn chat(&self, attach: Vec<String>, server: Option<String>) -> Result<String> {
        let orchestrator = self.container.orchestrator(server.as_deref());
        let uploads = self.container.upload_service();

        for path in &attach {
            attach_file(&uploads, path).await;
        }

        for message in orchestrator.store().snapshot() {
            if message.role() == Role::Assistant {
                println!("{}", message.content());
            }
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                println!();
                break;
            };

            match Input::parse(&line) {
                Input::Empty => {}
                Input::Quit => break,
                Input::Help => println!("{HELP}"),
                Input::Unknown(line) => println!("Unknown command: {line} (try /help)"),
                Input::Attach(path) => attach_file(&uploads, path).await,
                Input::Files => print_files(&uploads.files().await),
                Input::Remove(id) => {
                    if uploads.remove(id).await {
                        println!("Removed {id}");
                    } else {
                        println!("No attachment with id {id}");
                    }
                }
                Input::Clear => {
                    uploads.clear().await;
                    println!("Attachments cleared");
                }
                Input::Message(text) => {
                    let attachments = uploads.files().await;
                    match send_and_render(&orchestrator, text, attachments).await {
                        Ok(reply) => {
                            debug!("Reply {} complete at {:?}", reply.id(), reply.timestamp());
                            uploads.clear().await;
                        }
                        Err(e) => eprintln!("Error: {}", e.user_message()),
                    }
                }
            }
        }

        let exchanged = orchestrator
            .store()
            .snapshot()
            .iter()
            .filter(|m| !m.is_greeting())
            .count();
        Ok(format!("Conversation ended after {exchanged} messages."))
    }
}

async fn attach_file(uploads: &FileUploadService, path: &str) {
    let result = match PendingFile::from_path(path).await {
        Ok(file) => uploads.upload(vec![file]).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(files) => {
            for file in files {
                println!(
                    "Attached {} ({}, {} bytes) as {}",
                    file.name(),
                    file.mime_type(),
                    file.size(),
                    file.id()
                );
            }
        }
        Err(e) => eprintln!("Error: {}", e.user_message()),
    }
}

fn print_files(files: &[Attachment]) {
    if files.is_empty() {
        println!("No pending attachments.");
        return;
    }
    for file in files {
        let extracted = file
            .parsed_content()
            .map(|text| format!(", {} chars extracted", text.chars().count()))
            .unwrap_or_default();
        println!(
            "  {}  {} ({}, {} bytes{})",
            file.id(),
            file.name(),
            file.mime_type(),
            file.size(),
            extracted
        );
    }
}
