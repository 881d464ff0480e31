//! HTTP transport for LLM adapters
//!
//! Synchronous client with line-streaming support. Real transport uses
//! ureq; the fake is scripted for tests.

pub use crate::llm::adapters::transport_fake::FakeTransport;
pub use crate::llm::adapters::transport_types::{AdapterError, SyncTransport};
pub use crate::llm::adapters::transport_ureq::UreqTransport;

/// Concrete transport enum
///
/// `SyncTransport::post_stream` is generic, so the trait is not
/// dyn-compatible; this enum wraps the implementations instead.
#[derive(Debug)]
pub enum Transport {
    Real(UreqTransport),
    Fake(FakeTransport),
}

impl SyncTransport for Transport {
    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<String, AdapterError> {
        match self {
            Transport::Real(t) => t.post_json(url, headers, body),
            Transport::Fake(t) => t.post_json(url, headers, body),
        }
    }

    fn post_stream<F>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
        on_line: F,
    ) -> Result<String, AdapterError>
    where
        F: FnMut(&str),
    {
        match self {
            Transport::Real(t) => t.post_stream(url, headers, body, on_line),
            Transport::Fake(t) => t.post_stream(url, headers, body, on_line),
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Transport::Real(UreqTransport::new())
    }
}
