use crate::classify::Category;
use crate::request::{Label, Request};
use crate::transport::{Payload, RawResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// One successful fetch, owned by the worker processing it.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub request: Request,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub payload: Payload,
    pub content_type: Option<String>,
}

impl FetchResult {
    pub fn new(request: Request, response: RawResponse) -> Self {
        let content_type = response.content_type().map(str::to_string);
        Self {
            request,
            status: response.status,
            headers: response.headers,
            payload: response.payload,
            content_type,
        }
    }
}

/// Outcome of processing one dispatched request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub url: String,
    pub label: Label,
    pub category: Option<Category>,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub content_length: usize,
    pub response_time: Duration,
    pub saved_to: Option<PathBuf>,
    /// References found in the body that the frontier accepted.
    pub discovered: usize,
    pub error: Option<String>,
}

impl CrawlResult {
    pub fn new(request: &Request) -> Self {
        Self {
            url: request.url.to_string(),
            label: request.label,
            category: None,
            status_code: 0,
            content_type: None,
            content_length: 0,
            response_time: Duration::from_secs(0),
            saved_to: None,
            discovered: 0,
            error: None,
        }
    }

    pub fn with_error(request: &Request, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(request)
        }
    }

    /// The fetch itself failed, as opposed to a later save or skip.
    pub fn fetch_failed(&self) -> bool {
        self.error.is_some() && self.category.is_none()
    }
}
