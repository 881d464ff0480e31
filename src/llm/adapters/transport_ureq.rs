//! Real HTTP transport using ureq
//!
//! Synchronous blocking HTTP client for LLM adapters.

use crate::llm::adapters::transport_types::{AdapterError, SyncTransport};
use std::io::{BufRead, BufReader, Read};
use std::time::Duration;

/// Real HTTP transport using ureq
#[derive(Debug)]
pub struct UreqTransport {
    /// Per-request deadline in seconds
    timeout: u64,
}

impl UreqTransport {
    /// Create new transport with the default deadline (60s)
    pub fn new() -> Self {
        Self { timeout: 60 }
    }

    /// Create transport with a custom deadline
    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            timeout: timeout_secs,
        }
    }

    fn request(&self, url: &str, headers: &[(&str, &str)]) -> ureq::Request {
        let mut request = ureq::post(url).timeout(Duration::from_secs(self.timeout));
        for (key, value) in headers {
            request = request.set(key, value);
        }
        request
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncTransport for UreqTransport {
    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<String, AdapterError> {
        let response = self.request(url, headers).send_string(body)?;

        let mut reader = response.into_reader();
        let mut out = String::new();
        reader.read_to_string(&mut out)?;
        Ok(out)
    }

    fn post_stream<F>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
        mut on_line: F,
    ) -> Result<String, AdapterError>
    where
        F: FnMut(&str),
    {
        let response = self.request(url, headers).send_string(body)?;

        let mut reader = BufReader::new(response.into_reader());
        let mut full_body = String::new();
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            let trimmed = line.trim_end();
            on_line(trimmed);
            full_body.push_str(trimmed);
            full_body.push('\n');
        }

        Ok(full_body)
    }
}
