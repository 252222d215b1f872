mod attachment;
mod chat_request;
mod message;
mod prompt_message;
mod upload_limits;

pub use attachment::*;
pub use chat_request::*;
pub use message::*;
pub use prompt_message::*;
pub use upload_limits::*;
