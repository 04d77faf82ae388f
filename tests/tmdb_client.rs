use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use watchlog_enrich::{
    models::LookupKey,
    services::{MovieDatabase, RetryPolicy, TmdbProvider},
    AppError,
};

const PARASITE_SEARCH: &str = r#"{
    "page": 1,
    "results": [{"id": 496243, "title": "Parasite", "release_date": "2019-05-30"}],
    "total_results": 1
}"#;

const PARASITE_DETAILS: &str = r#"{
    "id": 496243,
    "genres": [
        {"id": 35, "name": "Comedy"},
        {"id": 53, "name": "Thriller"},
        {"id": 18, "name": "Drama"}
    ],
    "production_countries": [{"iso_3166_1": "KR", "name": "South Korea"}],
    "overview": "All unemployed, Ki-taek's family takes peculiar interest in the wealthy Parks.",
    "runtime": 133,
    "vote_average": 8.5,
    "credits": {"cast": [], "crew": [{"job": "Director", "name": "Bong Joon-ho"}]}
}"#;

fn http_response(status: &str, extra_headers: &[(&str, &str)], body: &str) -> String {
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
         Connection: close\r\n",
        status,
        body.len()
    );
    for (name, value) in extra_headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    format!("{}\r\n{}", head, body)
}

/// Serves the given responses in order, one per connection, and records each
/// request line
async fn serve(responses: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    tokio::spawn(async move {
        for response in responses {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let request = String::from_utf8_lossy(&buf);
            let request_line = request.lines().next().unwrap_or_default().to_string();
            recorded.lock().unwrap().push(request_line);

            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
    });

    (format!("http://{}/3", addr), requests)
}

fn provider(api_url: String, max_attempts: u32) -> TmdbProvider {
    TmdbProvider::new(
        "test_key".to_string(),
        api_url,
        "en-US".to_string(),
        Duration::from_secs(5),
        RetryPolicy::new(max_attempts, Duration::ZERO),
    )
    .unwrap()
}

fn parasite_key() -> LookupKey {
    LookupKey {
        title: "Parasite".to_string(),
        year: Some(2019),
    }
}

#[tokio::test]
async fn test_search_retries_after_rate_limit() {
    let (url, requests) = serve(vec![
        http_response("429 Too Many Requests", &[("Retry-After", "0")], "{}"),
        http_response("200 OK", &[], PARASITE_SEARCH),
    ])
    .await;

    let matches = provider(url, 3)
        .search_movies(&parasite_key())
        .await
        .unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, 496243);
    assert_eq!(matches[0].release_year, Some(2019));

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].starts_with("GET /3/search/movie?"));
    assert!(requests[1].contains("api_key=test_key"));
    assert!(requests[1].contains("query=Parasite"));
    assert!(requests[1].contains("year=2019"));
}

#[tokio::test]
async fn test_fetch_details_maps_fields() {
    let (url, requests) = serve(vec![http_response("200 OK", &[], PARASITE_DETAILS)]).await;

    let enrichment = provider(url, 1).fetch_details(496243).await.unwrap();

    assert_eq!(enrichment.genres, vec!["Comedy", "Thriller", "Drama"]);
    assert_eq!(enrichment.countries, vec!["South Korea"]);
    assert_eq!(enrichment.directors, vec!["Bong Joon-ho"]);
    assert_eq!(enrichment.runtime, Some(133));
    assert!(enrichment.synopsis.unwrap().starts_with("All unemployed"));

    let requests = requests.lock().unwrap();
    assert!(requests[0].starts_with("GET /3/movie/496243?"));
    assert!(requests[0].contains("append_to_response=credits"));
    assert!(requests[0].contains("language=en-US"));
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let (url, requests) = serve(vec![http_response(
        "401 Unauthorized",
        &[],
        r#"{"status_code":7,"status_message":"Invalid API key: You must be granted a valid key."}"#,
    )])
    .await;

    let err = provider(url, 3)
        .search_movies(&parasite_key())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ExternalApi { status: 401, .. }));
    assert_eq!(requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let unavailable = http_response("503 Service Unavailable", &[], "{}");
    let (url, requests) = serve(vec![
        unavailable.clone(),
        unavailable.clone(),
        unavailable,
    ])
    .await;

    let err = provider(url, 3)
        .fetch_details(496243)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ExternalApi { status: 503, .. }));
    assert_eq!(requests.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_malformed_body_is_an_api_error() {
    let (url, _) = serve(vec![http_response("200 OK", &[], "not json")]).await;

    let err = provider(url, 3)
        .search_movies(&parasite_key())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ExternalApi { .. }));
    assert!(!err.is_retryable());
}
