use crate::auth::AuthHandler;
use crate::filter::ListQuery;
use crate::models::{Category, ListResponse, MutationResponse};
use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use hyper::{Body, Client, Method, Request, StatusCode};
use hyper_rustls::HttpsConnector;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend rejected our credentials. Callers hand this to the
    /// [`AuthHandler`] instead of showing it.
    ///
    /// Only produced for HTTP 401 and 403; error text such as
    /// "Authentication failed" on other statuses stays a [`ApiError::Status`].
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("request failed with status {code}: {message}")]
    Status { code: u16, message: String },
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("network error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Operations the backend exposes for the email list.
#[async_trait]
pub trait EmailApi: Send + Sync {
    async fn list(&self, query: &ListQuery, page: u32, per_page: u32) -> ApiResult<ListResponse>;
    async fn archive(&self, id: &str) -> ApiResult<MutationResponse>;
    async fn trash(&self, id: &str) -> ApiResult<MutationResponse>;
    async fn update_labels(
        &self,
        id: &str,
        add: &[String],
        remove: &[String],
    ) -> ApiResult<MutationResponse>;
    async fn update_category(&self, id: &str, category: &Category) -> ApiResult<MutationResponse>;
    /// Asks the backend to pull fresh mail from the provider.
    async fn sync(&self) -> ApiResult<MutationResponse>;
}

pub struct HttpEmailApi {
    http: Client<HttpsConnector<HttpConnector>>,
    base_url: Url,
    auth: Arc<dyn AuthHandler>,
}

impl HttpEmailApi {
    pub fn new(base_url: &str, auth: Arc<dyn AuthHandler>) -> ApiResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidRequest(format!("bad base url {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidRequest(format!(
                "base url {} cannot carry paths",
                base_url
            )));
        }

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| ApiError::Transport(format!("failed to load native roots: {}", e)))?
            .https_or_http()
            .enable_http1()
            .build();

        Ok(Self {
            http: Client::builder().build(connector),
            base_url,
            auth,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        endpoint(&self.base_url, segments)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> ApiResult<T> {
        debug!("{} {}", method, url);

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(url.as_str())
            .header(ACCEPT, "application/json");
        if let Some(token) = self.auth.token() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value)?)
            }
            None => Body::empty(),
        };
        let request = builder
            .body(body)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        let response = self
            .http
            .request(request)
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if let Some(err) = classify_status(status, &bytes) {
            warn!("{} {} failed: {}", method, url, err);
            return Err(err);
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn endpoint(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidRequest("base url cannot carry paths".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// `GET /emails` with the resolved query. `showAll` is only sent when set.
fn list_url(base_url: &Url, query: &ListQuery, page: u32, per_page: u32) -> ApiResult<Url> {
    let mut url = endpoint(base_url, &["emails"])?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("page", &page.to_string());
        pairs.append_pair("limit", &per_page.to_string());
        if let Some(category) = &query.category {
            pairs.append_pair("category", category.as_str());
        }
        if let Some(status) = &query.status {
            pairs.append_pair("status", status.as_str());
        }
        if let Some(label) = &query.label {
            pairs.append_pair("label", label);
        }
        if query.show_all {
            pairs.append_pair("showAll", "true");
        }
    }
    Ok(url)
}

/// Maps a non-success HTTP status to a typed error. Only 401 and 403 count
/// as authentication failures; the body text is never inspected for that.
fn classify_status(status: StatusCode, body: &[u8]) -> Option<ApiError> {
    if status.is_success() {
        return None;
    }
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Some(ApiError::Auth(message));
    }
    Some(ApiError::Status {
        code: status.as_u16(),
        message,
    })
}

fn error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// A 2xx envelope can still report `"status": "error"`.
fn check_envelope(response: MutationResponse) -> ApiResult<MutationResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Rejected(
            response
                .message
                .unwrap_or_else(|| format!("status {}", response.status)),
        ))
    }
}

#[async_trait]
impl EmailApi for HttpEmailApi {
    async fn list(&self, query: &ListQuery, page: u32, per_page: u32) -> ApiResult<ListResponse> {
        let url = list_url(&self.base_url, query, page, per_page)?;
        self.send(Method::GET, url, None).await
    }

    async fn archive(&self, id: &str) -> ApiResult<MutationResponse> {
        let url = self.endpoint(&["emails", id, "archive"])?;
        check_envelope(self.send(Method::POST, url, None).await?)
    }

    async fn trash(&self, id: &str) -> ApiResult<MutationResponse> {
        let url = self.endpoint(&["emails", id, "trash"])?;
        check_envelope(self.send(Method::POST, url, None).await?)
    }

    async fn update_labels(
        &self,
        id: &str,
        add: &[String],
        remove: &[String],
    ) -> ApiResult<MutationResponse> {
        let url = self.endpoint(&["emails", id, "labels"])?;
        let body = serde_json::json!({ "add_labels": add, "remove_labels": remove });
        check_envelope(self.send(Method::POST, url, Some(body)).await?)
    }

    async fn update_category(&self, id: &str, category: &Category) -> ApiResult<MutationResponse> {
        let url = self.endpoint(&["emails", id, "category"])?;
        let body = serde_json::json!({ "category": category });
        check_envelope(self.send(Method::POST, url, Some(body)).await?)
    }

    async fn sync(&self) -> ApiResult<MutationResponse> {
        let url = self.endpoint(&["emails", "sync"])?;
        check_envelope(self.send(Method::POST, url, None).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterParams;

    struct NoAuth;

    impl AuthHandler for NoAuth {
        fn is_authenticated(&self) -> bool {
            true
        }
        fn handle_auth_error(&self) {}
        fn token(&self) -> Option<String> {
            None
        }
        fn sign_in(&self, _token: &str) -> Result<(), crate::auth::AuthError> {
            Ok(())
        }
        fn login_url(&self) -> &str {
            ""
        }
    }

    #[test]
    fn test_401_is_auth_error() {
        let err = classify_status(StatusCode::UNAUTHORIZED, br#"{"message":"token expired"}"#);
        match err {
            Some(ApiError::Auth(msg)) => assert_eq!(msg, "token expired"),
            other => panic!("expected auth error, got {:?}", other),
        }
        assert!(classify_status(StatusCode::FORBIDDEN, b"").is_some_and(|e| e.is_auth()));
    }

    #[test]
    fn test_other_failures_keep_status_and_message() {
        let err = classify_status(StatusCode::BAD_GATEWAY, b"not json");
        match err {
            Some(ApiError::Status { code, message }) => {
                assert_eq!(code, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("expected status error, got {:?}", other),
        }
        assert!(classify_status(StatusCode::OK, b"{}").is_none());
    }

    #[test]
    fn test_server_message_containing_token_is_not_auth() {
        let err = classify_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"error":"token bucket exhausted"}"#,
        );
        assert!(matches!(err, Some(ApiError::Status { code: 500, .. })));
    }

    #[test]
    fn test_envelope_error_is_rejected() {
        let response = MutationResponse {
            status: "error".to_string(),
            message: Some("Email not found".to_string()),
            data: None,
        };
        match check_envelope(response) {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Email not found"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_endpoint_escapes_ids_and_keeps_base_path() {
        let base = Url::parse("https://mail.example.com/api/").unwrap();
        let url = endpoint(&base, &["emails", "a/b c", "archive"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://mail.example.com/api/emails/a%2Fb%20c/archive"
        );
    }

    #[test]
    fn test_list_url_for_trash_sends_show_all() {
        let base = Url::parse("https://mail.example.com/api/").unwrap();
        let query = FilterParams::from_query("category=trash").resolve();
        let url = list_url(&base, &query, 1, 20).unwrap();
        assert_eq!(
            url.as_str(),
            "https://mail.example.com/api/emails?page=1&limit=20&category=trash&label=TRASH&showAll=true"
        );
    }

    #[test]
    fn test_list_url_omits_unset_filters() {
        let base = Url::parse("https://mail.example.com/api/").unwrap();
        let url = list_url(&base, &FilterParams::default().resolve(), 2, 20).unwrap();
        assert_eq!(url.as_str(), "https://mail.example.com/api/emails?page=2&limit=20");

        let query = FilterParams::from_query("category=social&status=unread").resolve();
        let url = list_url(&base, &query, 1, 50).unwrap();
        assert_eq!(url.query(), Some("page=1&limit=50&category=social&status=unread"));
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(matches!(
            HttpEmailApi::new("mailto:someone@example.com", Arc::new(NoAuth)),
            Err(ApiError::InvalidRequest(_))
        ));
    }
}
