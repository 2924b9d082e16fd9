//! # API Module
//!
//! The HTTP surface spotlink exposes to the user's browser: exactly one
//! endpoint, the OAuth redirect target on the loopback port.
//!
//! ## Overview
//!
//! Spotify sends the browser back to the configured redirect URI with either
//! `code` and `state`, or `error` and `state`, in the query string. This
//! module only deals with bytes and strings:
//!
//! - [`parse_request`] reads the request line of a buffered request
//! - [`evaluate`] matches it against the redirect path and the attempt's
//!   state nonce and yields the authorization code or the denial reason
//! - [`http_response`] renders the fixed pages sent back to the browser
//!
//! Socket handling and the listener state machine live in
//! [`crate::server`].
//!
//! ## Security Considerations
//!
//! - The code is never extracted from a request whose `state` does not match
//! - Only the request line is read; headers and bodies are ignored
//! - Served over plain HTTP, which is only acceptable because the listener is
//!   bound to the loopback interface

mod callback;

pub use callback::{
    CallbackOutcome, CallbackRequest, DEFAULT_SUCCESS_PAGE, FAILURE_PAGE, MAX_REQUEST_BYTES,
    NOT_FOUND_PAGE, evaluate, header_complete, http_response, parse_request,
};
