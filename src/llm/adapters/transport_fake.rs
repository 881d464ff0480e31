//! Fake transport for testing
//!
//! Scripted responses instead of real HTTP calls. Responses are consumed
//! in FIFO order so sequences of failures and recoveries can be staged;
//! the last response is sticky once the queue drains.

use crate::llm::adapters::transport_types::{AdapterError, SyncTransport};
use std::collections::VecDeque;
use std::sync::Mutex;

type Scripted = Result<String, String>;

/// Fake transport for testing (fixture strings, no network)
#[derive(Debug)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<Scripted>>,
    last: Mutex<Scripted>,
    /// Number of requests observed (both plain and streaming)
    calls: Mutex<usize>,
}

impl FakeTransport {
    /// Create fake transport returning the given body on every request
    pub fn new(response: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            last: Mutex::new(Ok(response.to_string())),
            calls: Mutex::new(0),
        }
    }

    /// Create fake transport that fails every request with a network error
    pub fn with_error(msg: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            last: Mutex::new(Err(msg.to_string())),
            calls: Mutex::new(0),
        }
    }

    /// Queue a successful response (consumed before the sticky default)
    pub fn push_response(&self, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(body.to_string()));
    }

    /// Queue a network failure
    pub fn push_error(&self, msg: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(msg.to_string()));
    }

    /// Requests observed so far
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn next(&self) -> Result<String, AdapterError> {
        *self.calls.lock().unwrap() += 1;
        let scripted = {
            let mut queue = self.responses.lock().unwrap();
            match queue.pop_front() {
                Some(next) => {
                    *self.last.lock().unwrap() = next.clone();
                    next
                }
                None => self.last.lock().unwrap().clone(),
            }
        };
        scripted.map_err(AdapterError::Network)
    }
}

impl SyncTransport for FakeTransport {
    fn post_json(
        &self,
        _url: &str,
        _headers: &[(&str, &str)],
        _body: &str,
    ) -> Result<String, AdapterError> {
        self.next()
    }

    fn post_stream<F>(
        &self,
        _url: &str,
        _headers: &[(&str, &str)],
        _body: &str,
        mut on_line: F,
    ) -> Result<String, AdapterError>
    where
        F: FnMut(&str),
    {
        let body = self.next()?;
        let mut full = String::new();
        for line in body.lines() {
            on_line(line);
            full.push_str(line);
            full.push('\n');
        }
        Ok(full)
    }
}
