//! Inbound parameter extraction and target-URL composition.
//!
//! Control parameters can arrive as a query parameter, a form field
//! (urlencoded bodies only) or an `X-`-prefixed header — checked in that
//! order, with empty values treated as absent at every level.

use axum::http::{HeaderMap, Uri, header};
use thiserror::Error;
use url::Url;

pub const HOST_PARAM: &str = "HostToForwardTo";
pub const TRY_FIRST_PARAM: &str = "TryFirst";
pub const TASK_UID_PARAM: &str = "TaskUid";

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("missing parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("could not compose target url from '{0}': {1}")]
    BadTargetUrl(String, #[source] url::ParseError),
}

/// What the entry decision layer needs from an inbound request.
#[derive(Debug, PartialEq)]
pub struct RelayParams {
    pub try_first: bool,
    pub task_uid: Option<String>,
    pub target_url: String,
}

pub fn parse_relay_params(
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<RelayParams, ValidationError> {
    let form = form_pairs(headers, body);

    let host = extract_param(HOST_PARAM, uri, &form, headers)
        .ok_or(ValidationError::MissingParameter(HOST_PARAM))?;

    // Unparsable TryFirst means "false", never a hard error.
    let try_first = extract_param(TRY_FIRST_PARAM, uri, &form, headers)
        .and_then(|value| parse_bool(&value))
        .unwrap_or(false);

    let task_uid = extract_param(TASK_UID_PARAM, uri, &form, headers);

    let target_url = compose_target_url(uri, &host)?;

    Ok(RelayParams {
        try_first,
        task_uid,
        target_url,
    })
}

/// Rebuild the URL the delivery should go to: same path, the query string
/// minus our control parameters, and the caller-supplied scheme+host. The
/// scheme is `http` only when the host string explicitly says so.
pub fn compose_target_url(uri: &Uri, host_to_forward_to: &str) -> Result<String, ValidationError> {
    let (scheme, host) = split_scheme_host(host_to_forward_to);
    let mut target = Url::parse(&format!("{scheme}://{host}"))
        .map_err(|e| ValidationError::BadTargetUrl(host_to_forward_to.to_string(), e))?;
    target.set_path(uri.path());

    let kept: Vec<(String, String)> = query_pairs(uri)
        .into_iter()
        .filter(|(name, _)| {
            // not interesting to the remote host
            name != HOST_PARAM && name != TRY_FIRST_PARAM && name != TASK_UID_PARAM
        })
        .collect();
    if kept.is_empty() {
        target.set_query(None);
    } else {
        target.query_pairs_mut().clear().extend_pairs(kept);
    }

    Ok(target.to_string())
}

fn split_scheme_host(host: &str) -> (&'static str, &str) {
    if let Some(rest) = host.strip_prefix("http://") {
        ("http", rest)
    } else {
        ("https", host.strip_prefix("https://").unwrap_or(host))
    }
}

fn extract_param(
    name: &str,
    uri: &Uri,
    form: &[(String, String)],
    headers: &HeaderMap,
) -> Option<String> {
    if let Some((_, value)) = query_pairs(uri)
        .into_iter()
        .find(|(k, v)| k == name && !v.is_empty())
    {
        return Some(value);
    }

    if let Some((_, value)) = form.iter().find(|(k, v)| k == name && !v.is_empty()) {
        return Some(value.clone());
    }

    headers
        .get(format!("X-{name}"))
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .into_owned()
        .collect()
}

fn form_pairs(headers: &HeaderMap, body: &[u8]) -> Vec<(String, String)> {
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return Vec::new();
    }
    url::form_urlencoded::parse(body).into_owned().collect()
}

/// Lenient bool parsing (the values Go's `strconv.ParseBool` accepts).
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
