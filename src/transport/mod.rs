//! HTTP transport to the camera's control API.
//!
//! The adapters only speak to the camera through the [`Transport`] trait so
//! they can be driven by [`mock::MockTransport`] in tests.

mod http;
pub mod mock;

pub use http::HttpTransport;

use async_trait::async_trait;
use serde_json::Value;
use url::form_urlencoded;

use crate::error::Result;

/// Request body in the camera's flat wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    /// `key=value&key=value`, form-encoded except for commas, which the
    /// camera expects raw in coordinate pairs.
    Form(Vec<(String, String)>),
    /// Opaque string, e.g. a raw command.
    Raw(String),
}

impl Body {
    pub fn form<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Encoded body text.
    pub fn encode(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Form(pairs) => pairs
                .iter()
                .map(|(k, v)| format!("{}={}", form_escape(k), form_escape(v)))
                .collect::<Vec<_>>()
                .join("&"),
            Self::Raw(text) => text.clone(),
        }
    }

    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::Form(_) => "application/x-www-form-urlencoded",
            Self::Empty | Self::Raw(_) => "text/plain",
        }
    }
}

fn form_escape(text: &str) -> String {
    form_urlencoded::byte_serialize(text.as_bytes())
        .map(|chunk| if chunk == "%2C" { "," } else { chunk })
        .collect()
}

/// Requests against the camera at a fixed address. Responses are JSON.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Base URL, e.g. `http://192.168.0.1`.
    fn base_url(&self) -> &str;

    async fn get(&self, path: &str) -> Result<Value>;

    async fn post(&self, path: &str, body: Body) -> Result<Value>;

    async fn put(&self, path: &str, body: Body) -> Result<Value>;
}
