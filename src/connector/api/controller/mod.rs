pub mod ask_controller;
pub mod chat_controller;
pub mod extract_controller;
pub mod serve_controller;
pub mod transcript;

pub use ask_controller::AskController;
pub use chat_controller::ChatController;
pub use extract_controller::ExtractController;
pub use serve_controller::ServeController;
