//! `HttpFetcher` against a local mock server.

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bgshops::ShopError;
use bgshops::fetcher::{HttpFetcher, PageFetcher};

#[tokio::test]
async fn fetch_returns_body_and_sends_user_agent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/category/board-games/"))
        .and(header("user-agent", "bgshops-test/0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ul><li>Azul</li></ul>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut fetcher = HttpFetcher::new("bgshops-test/0.1", 5).unwrap();
    let body = fetcher
        .fetch(&format!("{}/category/board-games/", server.uri()))
        .await
        .unwrap();

    assert_eq!(body, "<ul><li>Azul</li></ul>");
    fetcher.close().await.unwrap();
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut fetcher = HttpFetcher::new("bgshops-test/0.1", 5).unwrap();
    let url = format!("{}/gone", server.uri());
    let result = fetcher.fetch(&url).await;

    assert!(
        matches!(result, Err(ShopError::UnexpectedStatus { status: 404, url: ref u }) if *u == url),
        "expected UnexpectedStatus(404), got: {result:?}"
    );
}
