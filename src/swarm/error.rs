use http::StatusCode;
use std::collections::HashMap;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Missing config key {0}")]
    MissingConfig(&'static str),
    #[error("Failed to generate url {url} with params {params:?} caused by {source:?}")]
    InvalidUrl {
        url: String,
        params: HashMap<String, String>,
        source: url::ParseError,
    },
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("{0} was not found")]
    NotFound(String),
    #[error("Received bad response with status {status:?} and body {body:?}")]
    BadResponse { status: StatusCode, body: String },
    #[error("Failed to deserialize {content}")]
    Deserialization {
        content: String,
        source: serde_json::Error,
    },
}
