use crate::errors::SealResult;

/// Status and raw body of an HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        HttpResponse {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blocking HTTP transport used by remote synchronization.
///
/// An `Err` means the exchange did not complete (connection, TLS,
/// timeout). Any response that arrived, whatever its status, is `Ok`.
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str) -> SealResult<HttpResponse>;

    /// Sends `body` as `application/json`.
    fn put(&self, url: &str, body: &[u8]) -> SealResult<HttpResponse>;

    fn delete(&self, url: &str) -> SealResult<HttpResponse>;
}

/// Percent-encodes a query string component, keeping only unreserved
/// characters as they are.
pub(crate) fn encode_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    encoded
}
