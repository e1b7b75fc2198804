use serde::{Deserialize, Serialize};

/// Body of `POST {base}/api/generate`
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

/// One line of a streamed generation
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: Option<bool>,
}

/// A non-streaming generation: the text to show plus the body it came from
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateReply {
    pub response_text: String,
    pub raw_body: String,
}
