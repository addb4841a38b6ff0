use environments::{EnvironmentError, PayloadError};
use http::StatusCode;
use std::error::Error;

/// The request names an HTTP method the relay does not know.
///
/// This is the only failure `Relay::execute` reports to its caller.
#[derive(thiserror::Error, Debug, PartialEq)]
#[error("invalid HTTP method: {0:?}")]
pub struct InvalidMethodError(pub String);

#[derive(thiserror::Error, Debug)]
pub enum TokenAcquisitionError {
    #[error("token request failed: {}", describe(.0))]
    Request(#[from] reqwest::Error),
    #[error("token endpoint responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("token response did not contain an access_token")]
    MissingAccessToken,
    #[error("token expires_in is too large")]
    ExpiryOutOfRange,
    #[error("could not decode token response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum EnvironmentResolutionError {
    #[error("environment lookup failed: {0}")]
    Lookup(#[from] EnvironmentError),
    #[error("{0}")]
    MalformedPayload(#[from] PayloadError),
}

/// Anything that went wrong building or sending the outbound request.
#[derive(thiserror::Error, Debug)]
pub enum TransportFailure {
    #[error("{}", describe(.0))]
    Request(#[from] reqwest::Error),
    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),
    #[error("invalid value for header {0:?}")]
    InvalidHeaderValue(String),
}

#[derive(thiserror::Error, Debug)]
pub enum RelayServiceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("could not set up environment store: {0}")]
    EnvironmentStore(#[from] EnvironmentError),
}

/// Renders an error together with its source chain, e.g.
/// `error sending request for url (...): client error (Connect): tcp connect error: Connection refused`.
pub(crate) fn describe(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let text = cause.to_string();
        // Some layers repeat the message of their source
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }

    message
}
