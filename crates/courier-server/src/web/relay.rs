//! Entry decision layer: parse the inbound request, try-first or queue.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Response};
use tracing::warn;

use courier_core::domain::{DeliveryId, DeliveryRequest, DeliveryResponse, Headers};
use courier_core::forward::SyncOutcome;

use super::AppState;
use super::extract::parse_relay_params;

/// Fallback handler: POST/PUT is a relay command, anything else gets the
/// explanation page.
pub async fn relay(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST && method != Method::PUT {
        return explain();
    }

    let params = match parse_relay_params(&uri, &headers, &body) {
        Ok(params) => params,
        Err(error) => {
            return plain_error(
                StatusCode::BAD_REQUEST,
                format!("error parsing request: {error}"),
            );
        }
    };

    // Caller-supplied TaskUid wins; otherwise mint a fresh id. Either way
    // the id stays fixed for every retry of this delivery.
    let id = params
        .task_uid
        .map(DeliveryId::from)
        .unwrap_or_else(|| state.ids.generate());
    let request = DeliveryRequest::new(
        id,
        method.as_str(),
        params.target_url,
        to_multimap(&headers),
        body.to_vec(),
    );

    if params.try_first {
        match state.forwarder.forward(&request).await {
            Err(error) => {
                return plain_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string());
            }
            Ok(SyncOutcome::Concluded(response)) => return mirror(&response),
            Ok(SyncOutcome::Retryable(_)) => {
                // Transient outcome: let the queue take it from here.
            }
        }
    }

    match state.forwarder.forward_async(&request).await {
        Err(error) => plain_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("error enqueuing task: {error}"),
        ),
        // Accepted, not yet processed.
        Ok(()) => StatusCode::ACCEPTED.into_response(),
    }
}

/// Relay an upstream response verbatim: status, headers, body.
fn mirror(response: &DeliveryResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut headers = HeaderMap::new();
    for (name, values) in response.headers.iter() {
        for value in values {
            if let (Ok(header_name), Ok(header_value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(header_name, header_value);
            }
        }
    }
    (status, headers, response.body.clone()).into_response()
}

fn plain_error(status: StatusCode, message: String) -> Response {
    warn!(%status, reason = %message, "rejecting relay request");
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message,
    )
        .into_response()
}

fn to_multimap(headers: &HeaderMap) -> Headers {
    let mut multimap = Headers::new();
    for (name, value) in headers {
        multimap.append(
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }
    multimap
}

fn explain() -> Response {
    Html(SERVICE_DESCRIPTION).into_response()
}

const SERVICE_DESCRIPTION: &str = r#"<html>
<head>
	<title>courier</title>
	<meta charset="utf-8"/>
</head>
<body>
	<main>
		<h1>Retrying HTTP relay</h1>
		<p>
			This web-service acts as a persistent and retrying queue.<br/>
			Upon receipt of a POST or PUT-request, the service forwards the received
			HTTP request to a remote host. When the remote host does not return a
			success, the request is retried until success or until the retry-scheme
			is exhausted.<br/>
			The remote host is indicated by:
			<ul>
				<li>the HTTP query parameter "HostToForwardTo" or</li>
				<li>the HTTP-request-header "X-HostToForwardTo"</li>
			</ul>
			Pass "TryFirst=true" to attempt one synchronous delivery before
			anything is queued, and "TaskUid" to supply your own delivery id.
		</p>
		<p>
		Example request that forwards a POST to postman-echo.com:<br/><br/>
<pre>
curl -vvv \
	--data "This is expected to be sent back as part of response body." \
	-X POST \
	"http://localhost:8080/post?HostToForwardTo=https://postman-echo.com&TryFirst=true"
</pre>
		</p>
	</main>
</body>
</html>
"#;
