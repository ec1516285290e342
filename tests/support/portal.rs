//! Mock portal pages and mounts shared by integration tests.

#![allow(dead_code)]

use std::path::Path;

use jobcan_core::{ClientConfig, PortalEndpoints};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOGIN_PATH: &str = "/users/sign_in";
pub const STATUS_PATH: &str = "/employee";
pub const TOGGLE_PATH: &str = "/employee/index/adit";

pub fn login_page(csrf: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><meta name="csrf-param" content="authenticity_token"><meta name="csrf-token" content="{csrf}"></head><body><form action="/users/sign_in" method="post"></form></body></html>"#
    )
}

pub fn attendance_page(status: &str, token: Option<&str>) -> String {
    let token_input = token
        .map(|token| format!(r#"<input type="hidden" name="token" value="{token}">"#))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html><html><head><script>var current_status = "{status}";</script></head><body><form id="adit">{token_input}</form></body></html>"#
    )
}

pub fn toggle_json(status: &str) -> String {
    format!(r#"{{"result":1,"state":2,"current_status":"{status}"}}"#)
}

/// Client configuration pointing both portal hosts at `server`.
pub fn config_for(server: &MockServer, session_file: &Path) -> ClientConfig {
    let endpoints = PortalEndpoints::from_bases(&server.uri(), &server.uri())
        .unwrap_or_else(|e| panic!("mock server URI must parse: {e}"));
    ClientConfig::new("me@example.com", "secret", session_file).with_endpoints(endpoints)
}

pub async fn mount_login_page(server: &MockServer, csrf: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .and(query_param("app_key", "atd"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(login_page(csrf)),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub async fn mount_sign_in(server: &MockServer, status: &str, token: Option<&str>, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .append_header("set-cookie", "_jobcan_session=s1; Path=/; HttpOnly")
                .set_body_string(attendance_page(status, token)),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub async fn mount_status_page(server: &MockServer, status: &str, token: Option<&str>, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(attendance_page(status, token)),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub async fn mount_toggle(server: &MockServer, new_status: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOGGLE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(toggle_json(new_status)),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}
