// Protocol Module - Main module file
// Wire format, transport and the two ends of the handshake

pub mod header;
pub mod message;
pub mod transport;
pub mod server;
pub mod client;

pub use header::Header;
pub use message::Message;
pub use transport::{Transport, READ_BUFFER_SIZE};
pub use server::{serve_connection, ConnectionContext, Server, ServerSession, ServerState};
pub use client::{frame_message, parse_input_line, ChatClient, ClientContext, Exchange};
