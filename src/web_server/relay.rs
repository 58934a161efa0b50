use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use log::{debug, warn};
use std::sync::Arc;

const FORWARDED_HEADERS: [header::HeaderName; 3] =
    [header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT];

#[derive(Clone, Debug)]
pub struct RelayState {
    pub client: reqwest::Client,
    pub backend_url: Arc<str>,
}

impl RelayState {
    pub fn new(backend_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            backend_url: Arc::from(backend_url.trim_end_matches('/')),
        })
    }
}

fn bad_gateway(message: String) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(serde_json::json!({
            "error": "bad_gateway",
            "message": message
        })),
    )
        .into_response()
}

/// Sends the request on to the backend and hands its answer back as-is.
pub async fn forward(
    State(relay): State<RelayState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let target = format!("{}{}", relay.backend_url, path);
    debug!("Relay {} {}", method, target);

    let mut request = relay.client.request(method, &target).body(body);
    for name in FORWARDED_HEADERS {
        if let Some(value) = headers.get(&name) {
            request = request.header(name, value.clone());
        }
    }

    let upstream = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Backend unreachable at {}: {}", target, e);
            return bad_gateway(format!("Backend unavailable: {e}"));
        }
    };

    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return bad_gateway(format!("Backend response interrupted: {e}")),
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response
}
