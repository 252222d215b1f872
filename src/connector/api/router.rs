use anyhow::Result;

use crate::Commands;

use super::container::Container;
use super::controller::{AskController, ChatController, ExtractController, ServeController};

pub struct Router<'a> {
    serve_controller: ServeController<'a>,
    chat_controller: ChatController<'a>,
    ask_controller: AskController<'a>,
    extract_controller: ExtractController<'a>,
}

impl<'a> Router<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self {
            serve_controller: ServeController::new(container),
            chat_controller: ChatController::new(container),
            ask_controller: AskController::new(container),
            extract_controller: ExtractController::new(container),
        }
    }

    pub async fn route(&self, command: Commands) -> Result<String> {
        match command {
            Commands::Serve { port, public } => self.serve_controller.serve(port, public).await,
            Commands::Chat { server, attach } => self.chat_controller.chat(attach, server).await,
            Commands::Ask {
                message,
                server,
                attach,
            } => self.ask_controller.ask(message, attach, server).await,
            Commands::Extract { path } => self.extract_controller.extract(path).await,
        }
    }
}
