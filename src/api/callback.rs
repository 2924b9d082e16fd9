use url::Url;

use crate::error::CallbackError;

/// Upper bound for a buffered redirect request. Anything longer is parsed
/// as far as it got.
pub const MAX_REQUEST_BYTES: usize = 8 * 1024;

pub const DEFAULT_SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>spotlink</title></head>
<body>
    <h2>Authentication successful.</h2>
    <p>You can close this window.</p>
    <script>window.close();</script>
</body>
</html>"#;

pub const FAILURE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>spotlink</title></head>
<body>
    <h4>Login failed.</h4>
</body>
</html>"#;

pub const NOT_FOUND_PAGE: &str = "<h4>Not found.</h4>";

/// Request line of a redirect, with its query string decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackRequest {
    pub method: String,
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl CallbackRequest {
    /// First value of a query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// What a well-formed redirect for the right attempt carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Authorized(String),
    Denied(String),
}

/// True once the header terminator has arrived.
pub fn header_complete(buf: &[u8]) -> bool {
    buf.windows(4).any(|w| w == b"\r\n\r\n")
}

/// Parses the request line of a buffered HTTP request. Headers and body are
/// ignored.
pub fn parse_request(buf: &[u8]) -> Result<CallbackRequest, CallbackError> {
    let text = String::from_utf8_lossy(buf);
    let line = text
        .lines()
        .next()
        .ok_or_else(|| CallbackError::Malformed("empty request".to_string()))?;

    let parts: Vec<&str> = line.split_whitespace().collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(CallbackError::Malformed(format!("bad request line '{line}'")));
    };

    if !method.chars().all(|c| c.is_ascii_uppercase()) || !version.starts_with("HTTP/") {
        return Err(CallbackError::Malformed(format!("bad request line '{line}'")));
    }
    if !target.starts_with('/') {
        return Err(CallbackError::Malformed(format!("bad request target '{target}'")));
    }

    let url = Url::parse(&format!("http://127.0.0.1{target}"))
        .map_err(|e| CallbackError::Malformed(format!("bad request target '{target}': {e}")))?;
    let params = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    Ok(CallbackRequest {
        method: method.to_string(),
        path: url.path().to_string(),
        params,
    })
}

/// Checks a parsed redirect against the attempt it should belong to.
///
/// The code is only looked at after `state` matched; a request with a wrong
/// or missing `state` never yields it.
pub fn evaluate(
    request: &CallbackRequest,
    redirect_path: &str,
    expected_state: &str,
) -> Result<CallbackOutcome, CallbackError> {
    if request.method != "GET" {
        return Err(CallbackError::Malformed(format!(
            "unsupported method {}",
            request.method
        )));
    }
    if request.path != redirect_path {
        return Err(CallbackError::UnknownPath(request.path.clone()));
    }
    if request.param("state") != Some(expected_state) {
        return Err(CallbackError::StateMismatch);
    }

    if let Some(code) = request.param("code").filter(|c| !c.is_empty()) {
        return Ok(CallbackOutcome::Authorized(code.to_string()));
    }
    if let Some(error) = request.param("error") {
        return Ok(CallbackOutcome::Denied(error.to_string()));
    }
    Err(CallbackError::Malformed("redirect carries neither code nor error".to_string()))
}

/// Complete HTTP/1.1 response with an HTML body. The connection is always
/// closed afterwards.
pub fn http_response(status: u16, reason: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}
