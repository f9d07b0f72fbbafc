//! An [`HttpClient`] that answers every request with a fixed response.

use super::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Request, Response};
use std::sync::Mutex;

pub(crate) struct CannedClient {
    status: u16,
    body: &'static str,
    seen: Mutex<Vec<HeaderMap>>,
}

impl CannedClient {
    pub(crate) fn new(status: u16, body: &'static str) -> Self {
        Self {
            status,
            body,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Headers of every request received so far.
    pub(crate) fn seen_headers(&self) -> Vec<HeaderMap> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for CannedClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        self.seen.lock().unwrap().push(req.headers().clone());
        let response = http::Response::builder()
            .status(self.status)
            .body(self.body)
            .unwrap();
        Ok(Response::from(response))
    }
}
