use futures::StreamExt;
use tokio::time::{timeout, Duration};

use crate::api::models::GenerateChunk;
use crate::error::{HkubeMcpError, Result};

/// Read a newline-delimited JSON generation stream, handing each piece of
/// text to `on_chunk` as it arrives. Lines that are not generation chunks
/// are passed through verbatim. Returns the full text.
pub async fn process_streaming_response<F>(
    response: reqwest::Response,
    timeout_secs: u64,
    mut on_chunk: F,
) -> Result<String>
where
    F: FnMut(&str),
{
    let mut stream = response.bytes_stream();
    let mut incomplete_line = String::new();
    let mut full_text = String::new();
    let chunk_timeout = Duration::from_secs(timeout_secs);

    loop {
        match timeout(chunk_timeout, stream.next()).await {
            Ok(Some(chunk)) => {
                let chunk = chunk?;
                incomplete_line.push_str(&String::from_utf8_lossy(&chunk));
            }
            Ok(None) => break,
            Err(_) => {
                tracing::warn!(timeout_secs, "no data received from generation stream");
                return Err(HkubeMcpError::Timeout);
            }
        }

        // Only complete lines are processed
        let Some(last_newline_pos) = incomplete_line.rfind('\n') else {
            continue;
        };
        let complete: String = incomplete_line.drain(..=last_newline_pos).collect();

        for line in complete.lines() {
            if handle_line(line, &mut full_text, &mut on_chunk) {
                return Ok(full_text);
            }
        }
    }

    // Stream ended without a trailing newline
    if !incomplete_line.trim().is_empty() {
        handle_line(&incomplete_line, &mut full_text, &mut on_chunk);
    }

    Ok(full_text)
}

/// Returns true once the stream reports it is done
fn handle_line<F: FnMut(&str)>(line: &str, full_text: &mut String, on_chunk: &mut F) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }

    match serde_json::from_str::<GenerateChunk>(line) {
        Ok(chunk) => {
            if let Some(text) = chunk.response.as_deref() {
                if !text.is_empty() {
                    full_text.push_str(text);
                    on_chunk(text);
                }
            }
            chunk.done.unwrap_or(false)
        }
        Err(e) => {
            tracing::debug!(error = %e, "non-JSON line in generation stream");
            let text = format!("{}\n", line);
            full_text.push_str(&text);
            on_chunk(&text);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_response_fields_until_done() {
        let mut seen = Vec::new();
        let mut full = String::new();
        let mut collect = |s: &str| seen.push(s.to_string());

        assert!(!handle_line(r#"{"response":"Hel","done":false}"#, &mut full, &mut collect));
        assert!(!handle_line(r#"{"response":"lo"}"#, &mut full, &mut collect));
        assert!(handle_line(r#"{"response":"","done":true}"#, &mut full, &mut collect));

        assert_eq!(full, "Hello");
        assert_eq!(seen, vec!["Hel", "lo"]);
    }

    #[test]
    fn passes_through_non_json_lines() {
        let mut full = String::new();
        let mut noop = |_: &str| {};
        handle_line("not json", &mut full, &mut noop);
        assert_eq!(full, "not json\n");
    }
}
