//! End-to-end login flow through a running gateway.
//!
//! Each test starts an echo backend, a mock CAS server and the gateway on
//! ephemeral ports, then drives the gateway with a real HTTP client.

mod common;

use common::{client, start_echo_backend, start_gateway, TestGateway};
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::StatusCode;

const SUCCESS_XML: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
    <cas:authenticationSuccess>
        <cas:user>alice</cas:user>
        <cas:attributes>
            <cas:employeeName>Alice</cas:employeeName>
        </cas:attributes>
    </cas:authenticationSuccess>
</cas:serviceResponse>"#;

const FAILURE_XML: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
    <cas:authenticationFailure code="INVALID_TICKET">Ticket not recognized</cas:authenticationFailure>
</cas:serviceResponse>"#;

async fn gateway(cas_url: &str, prefix: &str) -> TestGateway {
    let backend = start_echo_backend().await;
    start_gateway(&format!(
        r#"
        [cas]
        base_url = "{cas_url}"
        service_base_url = "http://gateway.test"

        [route]
        name = "app"
        path = "{prefix}"
        target = "{backend}"
        "#
    ))
    .await
}

fn location(response: &reqwest::Response) -> String {
    response.headers()[LOCATION].to_str().unwrap().to_string()
}

/// The `name=value` pair of the response's `Set-Cookie` header.
fn cookie_pair(response: &reqwest::Response) -> String {
    let value = response.headers()[SET_COOKIE].to_str().unwrap();
    value.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_health_is_served_without_login() {
    let cas = mockito::Server::new_async().await;
    let gw = gateway(&cas.url(), "/app").await;

    let response = client().get(gw.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_unauthenticated_request_redirects_to_login() {
    let cas = mockito::Server::new_async().await;
    let gw = gateway(&cas.url(), "/app").await;

    let response = client().get(gw.url("/app/reports")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        format!("{}/login?service=http%3A%2F%2Fgateway.test%2Fapp", cas.url())
    );
}

#[tokio::test]
async fn test_ticket_login_then_authenticated_forward() {
    let mut cas = mockito::Server::new_async().await;
    let validate = cas
        .mock("GET", "/p3/serviceValidate")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("ticket".into(), "ST-42".into()),
            mockito::Matcher::UrlEncoded("service".into(), "http://gateway.test/app".into()),
        ]))
        .with_status(200)
        .with_body(SUCCESS_XML)
        .create_async()
        .await;
    let gw = gateway(&cas.url(), "/app").await;
    let http = client();

    let login = http.get(gw.url("/app?ticket=ST-42")).send().await.unwrap();
    assert_eq!(login.status(), StatusCode::FOUND);
    assert_eq!(location(&login), "/app");
    let cookie = cookie_pair(&login);
    validate.assert_async().await;

    let response = http
        .get(gw.url("/app/reports?year=2024"))
        .header(COOKIE, &cookie)
        .header("x-user", "mallory")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines, vec!["/reports?year=2024", "alice", "Alice"]);
}

#[tokio::test]
async fn test_rejected_ticket_redirects_to_login() {
    let mut cas = mockito::Server::new_async().await;
    let _validate = cas
        .mock("GET", "/p3/serviceValidate")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(FAILURE_XML)
        .create_async()
        .await;
    let gw = gateway(&cas.url(), "/app").await;

    let response = client().get(gw.url("/app?ticket=ST-bad")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(location(&response).starts_with(&format!("{}/login?service=", cas.url())));
    assert!(response.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_static_asset_bypasses_login() {
    let cas = mockito::Server::new_async().await;
    let gw = gateway(&cas.url(), "/app").await;

    let response = client().get(gw.url("/app/static/logo.png")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert_eq!(body.lines().next(), Some("/app/static/logo.png"));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let cas = mockito::Server::new_async().await;
    let gw = gateway(&cas.url(), "/app").await;

    let response = client().post(gw.url("/logout")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        format!("{}/logout?service=http%3A%2F%2Fgateway.test%2Fapp", cas.url())
    );
    let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("cas_gateway_session="));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_root_mount_redirects_to_request_directory() {
    let mut cas = mockito::Server::new_async().await;
    let _validate = cas
        .mock("GET", "/p3/serviceValidate")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(SUCCESS_XML)
        .create_async()
        .await;
    let gw = gateway(&cas.url(), "").await;

    let response = client().get(gw.url("/?ticket=ST-1")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
}
