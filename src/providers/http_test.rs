use super::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[test]
fn base_url_trailing_slashes_are_trimmed() {
    assert_eq!(normalize_base_url("http://localhost:3000/"), "http://localhost:3000");
    assert_eq!(normalize_base_url("  https://auth.example.com//  "), "https://auth.example.com");
}

#[test]
fn endpoints_are_built_from_base_url() {
    let base = "http://localhost:3000";
    assert_eq!(me_endpoint(base), "http://localhost:3000/api/auth/me");
    assert_eq!(refresh_endpoint(base), "http://localhost:3000/api/auth/refresh");
    assert_eq!(logout_endpoint(base), "http://localhost:3000/api/auth/logout");
}

#[test]
fn status_message_includes_stage_and_code() {
    let msg = status_message("refresh", StatusCode::BAD_GATEWAY);
    assert_eq!(msg, "refresh request failed: 502");
}

#[test]
fn config_new_uses_default_timeout() {
    let config = HttpBackendConfig::new("http://x");
    assert_eq!(config.timeout, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
}

#[test]
fn backend_normalizes_configured_base_url() {
    let backend = HttpSessionBackend::new(&HttpBackendConfig::new("http://localhost:3000/")).unwrap();
    assert_eq!(backend.base_url(), "http://localhost:3000");
}

#[tokio::test]
async fn unreachable_backend_maps_to_stage_errors() {
    // Port 9 (discard) on loopback is reliably closed in test environments.
    let mut config = HttpBackendConfig::new("http://127.0.0.1:9");
    config.timeout = Duration::from_secs(2);
    let backend = HttpSessionBackend::new(&config).unwrap();
    let credential = Credential::new("tok");

    assert!(matches!(backend.resolve_user(&credential).await, Err(SessionError::Resolve(_))));
    assert!(matches!(backend.refresh_credential(&credential).await, Err(SessionError::Refresh(_))));
    assert!(matches!(backend.revoke_credential(&credential).await, Err(SessionError::Revoke(_))));
}

// =============================================================================
// canned responses over loopback
// =============================================================================

/// Serve exactly one request with `status` and a JSON `body`.
///
/// Returns the backend pointed at the listener and a handle yielding the
/// raw request head as received.
async fn serve_once(status: &str, body: &str) -> (HttpSessionBackend, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let response = format!(
        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        String::from_utf8_lossy(&head).to_ascii_lowercase()
    });

    let backend = HttpSessionBackend::new(&HttpBackendConfig::new(base)).unwrap();
    (backend, handle)
}

#[tokio::test]
async fn resolve_decodes_user_and_sends_bearer() {
    let (backend, request) =
        serve_once("200 OK", r#"{"id":"alice","expires_at":1700000000000,"name":"Alice"}"#).await;

    let user = backend.resolve_user(&Credential::new("tok-1")).await.unwrap();

    assert_eq!(user.id, "alice");
    assert_eq!(user.expires_at, 1_700_000_000_000);
    assert_eq!(user.profile.get("name"), Some(&serde_json::json!("Alice")));
    let head = request.await.unwrap();
    assert!(head.starts_with("get /api/auth/me http/1.1"), "{head}");
    assert!(head.contains("authorization: bearer tok-1"), "{head}");
}

#[tokio::test]
async fn resolve_rejection_maps_to_resolve_error() {
    let (backend, _request) = serve_once("401 Unauthorized", "{}").await;

    let err = backend.resolve_user(&Credential::new("tok")).await.unwrap_err();

    match err {
        SessionError::Resolve(msg) => assert!(msg.contains("401"), "{msg}"),
        other => panic!("expected Resolve, got {other:?}"),
    }
}

#[tokio::test]
async fn resolve_malformed_body_maps_to_resolve_error() {
    let (backend, _request) = serve_once("200 OK", r#"{"name":"no id"}"#).await;

    let result = backend.resolve_user(&Credential::new("tok")).await;

    assert!(matches!(result, Err(SessionError::Resolve(_))));
}

#[tokio::test]
async fn refresh_decodes_rotation_and_claims() {
    let (backend, request) =
        serve_once("200 OK", r#"{"expires_at":1700000500000,"credential":"tok-2","tier":"gold"}"#).await;

    let refreshed = backend.refresh_credential(&Credential::new("tok-1")).await.unwrap();

    assert_eq!(refreshed.expires_at, 1_700_000_500_000);
    assert_eq!(refreshed.credential, Some(Credential::new("tok-2")));
    assert_eq!(refreshed.claims.get("tier"), Some(&serde_json::json!("gold")));
    assert!(!refreshed.claims.contains_key("credential"));
    let head = request.await.unwrap();
    assert!(head.starts_with("post /api/auth/refresh http/1.1"), "{head}");
    assert!(head.contains("authorization: bearer tok-1"), "{head}");
}

#[tokio::test]
async fn refresh_server_error_maps_to_refresh_error() {
    let (backend, _request) = serve_once("500 Internal Server Error", "{}").await;

    let err = backend.refresh_credential(&Credential::new("tok")).await.unwrap_err();

    match err {
        SessionError::Refresh(msg) => assert_eq!(msg, "refresh request failed: 500"),
        other => panic!("expected Refresh, got {other:?}"),
    }
}

#[tokio::test]
async fn revoke_success_is_ok() {
    let (backend, request) = serve_once("204 No Content", "").await;

    backend.revoke_credential(&Credential::new("tok-1")).await.unwrap();

    let head = request.await.unwrap();
    assert!(head.starts_with("post /api/auth/logout http/1.1"), "{head}");
    assert!(head.contains("authorization: bearer tok-1"), "{head}");
}

#[tokio::test]
async fn revoke_of_already_gone_session_is_ok() {
    let (backend, _request) = serve_once("401 Unauthorized", "{}").await;

    assert!(backend.revoke_credential(&Credential::new("tok")).await.is_ok());
}

#[tokio::test]
async fn revoke_server_error_maps_to_revoke_error() {
    let (backend, _request) = serve_once("503 Service Unavailable", "{}").await;

    let result = backend.revoke_credential(&Credential::new("tok")).await;

    assert!(matches!(result, Err(SessionError::Revoke(msg)) if msg.contains("503")));
}
