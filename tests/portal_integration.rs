//! Integration tests for the portal client against a mock portal.

mod support;

use std::time::Duration;

use jobcan_core::extract::ExtractError;
use jobcan_core::session::now_unix;
use jobcan_core::{CallContext, ClientConfig, PortalClient, PortalEndpoints, PortalError, Step, StoredCookie};
use support::portal::{
    LOGIN_PATH, STATUS_PATH, TOGGLE_PATH, attendance_page, config_for, login_page, mount_login_page,
    mount_sign_in, mount_status_page, mount_toggle,
};
use support::socket_guard::{closed_local_addr, start_portal_or_skip};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn ctx() -> CallContext {
    CallContext::with_timeout(Duration::from_secs(5))
}

/// Seeds a session that is valid for the next half hour.
fn seed_valid_session(client: &PortalClient, server_uri: &str) {
    let url = Url::parse(server_uri).unwrap();
    client
        .session()
        .record_cookies(&url, ["_jobcan_session=seeded; Path=/"]);
    assert!(client.is_logined());
}

#[tokio::test]
async fn test_login_page_non_200_aborts_before_sign_in() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    mount_sign_in(&server, "off", Some("tok1"), 0).await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();
    let err = client.login(&ctx()).await.unwrap_err();

    assert!(
        matches!(
            err,
            PortalError::HttpStatus {
                step: Step::LoginPage,
                status: 503,
                ..
            }
        ),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn test_login_without_csrf_token_is_parse_error() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><head></head></html>"))
        .mount(&server)
        .await;
    mount_sign_in(&server, "off", Some("tok1"), 0).await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();
    let err = client.login(&ctx()).await.unwrap_err();

    assert!(matches!(
        err,
        PortalError::Parse {
            step: Step::LoginPage,
            source: ExtractError::MissingField { .. },
        }
    ));
}

#[tokio::test]
async fn test_login_submits_credentials_and_returns_status_and_token() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    mount_login_page(&server, "abc", 1).await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .and(body_string_contains("authenticity_token=abc"))
        .and(body_string_contains("user%5Bemail%5D=me%40example.com"))
        .and(body_string_contains("user%5Bpassword%5D=secret"))
        .and(body_string_contains("app_key=atd"))
        .and(body_string_contains("commit=Login"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "_jobcan_session=s1; Path=/")
                .set_body_string(attendance_page("working", Some("tok1"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();
    let outcome = client.login(&ctx()).await.unwrap();

    assert_eq!(outcome.status, "working");
    assert_eq!(outcome.token, "tok1");
    assert!(client.is_logined());
}

#[tokio::test]
async fn test_login_tolerates_missing_toggle_token() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    mount_login_page(&server, "abc", 1).await;
    mount_sign_in(&server, "resting", None, 1).await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();
    let outcome = client.login(&ctx()).await.unwrap();

    assert_eq!(outcome.status, "resting");
    assert!(outcome.token.is_empty());
}

#[tokio::test]
async fn test_unauthenticated_toggle_logs_in_once_and_uses_login_token() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    mount_login_page(&server, "abc", 1).await;
    mount_sign_in(&server, "off", Some("tok1"), 1).await;
    mount_status_page(&server, "off", Some("other"), 0).await;
    Mock::given(method("POST"))
        .and(path(TOGGLE_PATH))
        .and(body_string_contains("is_yakin=0"))
        .and(body_string_contains("adit_item=DEF"))
        .and(body_string_contains("token=tok1"))
        .and(body_string_contains("adit_group_id=3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"current_status":"working"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();
    assert!(!client.is_logined());

    let outcome = client.toggle(&ctx()).await.unwrap();

    assert_eq!(outcome.previous, "off");
    assert_eq!(outcome.current, "working");
    assert!(!client.session().is_empty());
}

#[tokio::test]
async fn test_authenticated_toggle_uses_status_page_token() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    mount_login_page(&server, "abc", 0).await;
    mount_status_page(&server, "working", Some("tok2"), 1).await;
    Mock::given(method("POST"))
        .and(path(TOGGLE_PATH))
        .and(body_string_contains("token=tok2"))
        .and(body_string_contains("adit_group_id=7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"current_status":"resting"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = config_for(&server, &dir.path().join("cookies.json")).with_adit_group_id("7");
    let mut client = PortalClient::new(config).unwrap();
    seed_valid_session(&client, &server.uri());

    let outcome = client.toggle(&ctx()).await.unwrap();
    assert_eq!(outcome.previous, "working");
    assert_eq!(outcome.current, "resting");
}

#[tokio::test]
async fn test_authenticated_toggle_without_token_fails_before_posting() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    mount_status_page(&server, "working", None, 1).await;
    mount_toggle(&server, "resting", 0).await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();
    seed_valid_session(&client, &server.uri());

    let err = client.toggle(&ctx()).await.unwrap_err();
    assert!(matches!(
        err,
        PortalError::Parse {
            step: Step::StatusPage,
            source: ExtractError::MissingField { field: "token" },
        }
    ));
}

#[tokio::test]
async fn test_get_status_with_valid_session_skips_login() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    mount_login_page(&server, "abc", 0).await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .and(header("cookie", "_jobcan_session=seeded"))
        .respond_with(ResponseTemplate::new(200).set_body_string(attendance_page("working", None)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();
    seed_valid_session(&client, &server.uri());

    assert_eq!(client.get_status(&ctx()).await.unwrap(), "working");
}

#[tokio::test]
async fn test_get_status_without_session_logs_in() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    mount_login_page(&server, "abc", 1).await;
    mount_sign_in(&server, "off", Some("tok1"), 1).await;
    mount_status_page(&server, "off", Some("tok1"), 0).await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();

    assert_eq!(client.get_status(&ctx()).await.unwrap(), "off");
    assert!(client.is_logined());
}

#[tokio::test]
async fn test_status_page_error_status_is_reported() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();
    seed_valid_session(&client, &server.uri());

    let err = client.get_status(&ctx()).await.unwrap_err();
    assert!(matches!(
        err,
        PortalError::HttpStatus {
            step: Step::StatusPage,
            status: 500,
            ..
        }
    ));
}

#[tokio::test]
async fn test_status_page_with_two_assignments_is_ambiguous() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    let body = format!(
        "{}<script>var current_status = \"resting\";</script>",
        attendance_page("working", Some("tok"))
    );
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();
    seed_valid_session(&client, &server.uri());

    let err = client.get_status(&ctx()).await.unwrap_err();
    assert!(matches!(
        err,
        PortalError::Parse {
            source: ExtractError::AmbiguousStatus { count: 2 },
            ..
        }
    ));
}

#[tokio::test]
async fn test_toggle_with_html_response_is_parse_error() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    mount_status_page(&server, "working", Some("tok"), 1).await;
    Mock::given(method("POST"))
        .and(path(TOGGLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_page("x")))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();
    seed_valid_session(&client, &server.uri());

    let err = client.toggle(&ctx()).await.unwrap_err();
    assert!(matches!(
        err,
        PortalError::Parse {
            step: Step::Toggle,
            source: ExtractError::InvalidToggleResponse(_),
        }
    ));
}

#[tokio::test]
async fn test_slow_portal_exceeds_deadline() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(login_page("abc"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();
    let short = CallContext::with_timeout(Duration::from_millis(200));

    let err = client.login(&short).await.unwrap_err();
    assert!(matches!(err, PortalError::Timeout { step: Step::LoginPage }));
}

#[tokio::test]
async fn test_session_persisted_by_close_is_reused() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    mount_login_page(&server, "abc", 1).await;
    mount_sign_in(&server, "off", Some("tok1"), 1).await;
    mount_toggle(&server, "working", 1).await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .and(header("cookie", "_jobcan_session=s1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(attendance_page("working", None)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let session_file = dir.path().join("cookies.json");

    let mut first = PortalClient::new(config_for(&server, &session_file)).unwrap();
    first.toggle(&ctx()).await.unwrap();
    first.close().unwrap();
    assert!(session_file.exists());

    let mut second = PortalClient::new(config_for(&server, &session_file)).unwrap();
    assert!(second.is_logined());
    assert_eq!(second.get_status(&ctx()).await.unwrap(), "working");
    second.close().unwrap();
}

#[tokio::test]
async fn test_session_near_expiry_triggers_login() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    mount_login_page(&server, "abc", 1).await;
    mount_sign_in(&server, "off", Some("tok1"), 1).await;
    mount_status_page(&server, "off", Some("tok1"), 0).await;

    let dir = TempDir::new().unwrap();
    let session_file = dir.path().join("cookies.json");
    let host = Url::parse(&server.uri()).unwrap().host_str().unwrap().to_string();
    let stale = vec![StoredCookie::new(
        host,
        true,
        "/",
        false,
        true,
        now_unix() + 30,
        "_jobcan_session",
        "old",
    )];
    std::fs::write(&session_file, serde_json::to_string(&stale).unwrap()).unwrap();

    let mut client = PortalClient::new(config_for(&server, &session_file)).unwrap();
    assert!(!client.is_logined());
    assert_eq!(client.get_status(&ctx()).await.unwrap(), "off");
    assert!(client.is_logined());
}

#[tokio::test]
async fn test_unreachable_portal_is_transport_error() {
    let Some(addr) = closed_local_addr() else {
        return;
    };
    let base = format!("http://{addr}");
    let dir = TempDir::new().unwrap();
    let config = ClientConfig::new("me@example.com", "secret", dir.path().join("cookies.json"))
        .with_endpoints(PortalEndpoints::from_bases(&base, &base).unwrap());
    let mut client = PortalClient::new(config).unwrap();

    let err = client.login(&ctx()).await.unwrap_err();
    assert!(
        matches!(
            err,
            PortalError::Transport {
                step: Step::LoginPage,
                ..
            }
        ),
        "unexpected error: {err}"
    );
    assert!(client.session().is_empty());
}

#[tokio::test]
async fn test_sign_in_non_200_is_http_status_error() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    mount_login_page(&server, "abc", 1).await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid email or password"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();
    let err = client.login(&ctx()).await.unwrap_err();

    assert!(matches!(
        err,
        PortalError::HttpStatus {
            step: Step::SignIn,
            status: 401,
            ..
        }
    ));
    assert!(!client.is_logined());
}

#[tokio::test]
async fn test_sign_in_response_without_status_is_parse_error() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    mount_login_page(&server, "abc", 1).await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_page("again")))
        .expect(1)
        .mount(&server)
        .await;
    mount_toggle(&server, "working", 0).await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();
    let err = client.toggle(&ctx()).await.unwrap_err();

    assert!(matches!(
        err,
        PortalError::Parse {
            step: Step::SignIn,
            source: ExtractError::StatusNotFound,
        }
    ));
}

#[tokio::test]
async fn test_toggle_endpoint_non_200_is_http_status_error() {
    let Some(server) = start_portal_or_skip().await else {
        return;
    };
    mount_status_page(&server, "working", Some("tok"), 1).await;
    Mock::given(method("POST"))
        .and(path(TOGGLE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut client = PortalClient::new(config_for(&server, &dir.path().join("cookies.json"))).unwrap();
    seed_valid_session(&client, &server.uri());

    let err = client.toggle(&ctx()).await.unwrap_err();
    assert!(matches!(
        err,
        PortalError::HttpStatus {
            step: Step::Toggle,
            status: 500,
            ..
        }
    ));
}
