pub mod client;
pub mod models;
pub mod response;
pub mod streaming;

pub use client::GenerateClient;
pub use models::{GenerateChunk, GenerateReply, GenerateRequest};
pub use response::extract_response_text;
pub use streaming::process_streaming_response;
