use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the streaming chat endpoint over HTTP
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Bind to 0.0.0.0 instead of 127.0.0.1, exposing the server on all network interfaces
        #[arg(long)]
        public: bool,
    },

    /// Start an interactive conversation in the terminal
    Chat {
        /// Send messages to a running server instead of calling the provider directly
        #[arg(long)]
        server: Option<String>,

        /// Files to attach to the first message
        #[arg(short, long)]
        attach: Vec<String>,
    },

    /// Send a single message and stream the answer to stdout
    Ask {
        message: String,

        #[arg(long)]
        server: Option<String>,

        #[arg(short, long)]
        attach: Vec<String>,
    },

    /// Print the text extracted from a PDF file
    Extract { path: String },
}
