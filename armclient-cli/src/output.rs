//! Rendering of command output.

use std::fmt::Write;

use armclient_core::{HeaderPair, ResponseResult, Verb};

/// Pretty-print `bytes` when they are JSON, otherwise return them as text.
pub fn pretty_json(bytes: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value) => serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned()),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Request line, status, timing and headers of a completed request.
///
/// Only caller-supplied request headers are echoed; the defaults carry the
/// bearer token.
pub fn response_detail(verb: Verb, response: &ResponseResult, sent: &[HeaderPair]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{} {}", verb, response.url);
    for header in sent {
        let _ = writeln!(out, "{}: {}", header.name, header.value);
    }

    let _ = writeln!(
        out,
        "\nStatus: {} ({} ms)",
        status_line(response.status),
        response.elapsed.as_millis()
    );
    for (name, value) in &response.headers {
        let _ = writeln!(out, "{}: {}", name, value);
    }

    out
}

fn status_line(status: u16) -> String {
    match reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
    {
        Some(reason) => format!("{} {}", status, reason),
        None => status.to_string(),
    }
}
