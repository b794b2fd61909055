//! Integration tests for the polite fetch layer
//!
//! These tests use wiremock to stand in for a rate-limiting source and a
//! manual clock so backoff waits are recorded instead of slept.

use page_sieve::config::Config;
use page_sieve::fetch::{FetchError, FetchOptions, ManualClock, Pacer, RequestScheduler};
use page_sieve::TransportErrorKind;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a source configuration pointing at the mock server
fn create_test_config(base_url: &str) -> Config {
    Config::for_source("mock", base_url)
}

/// Creates a scheduler whose pacing and backoff run on a manual clock
fn manual_scheduler(config: &Config) -> (RequestScheduler, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let pacer = Arc::new(Pacer::with_clock(
        config.fetcher.min_interval(),
        clock.clone(),
    ));
    let scheduler =
        RequestScheduler::with_pacer(config, pacer).expect("Failed to create scheduler");
    (scheduler, clock)
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .expect("Request recording disabled")
        .len()
}

#[tokio::test]
async fn test_fetch_success_sends_source_headers() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let config = create_test_config(&base_url);

    Mock::given(method("GET"))
        .and(path("/series/solo-leveling"))
        .and(header("referer", format!("{}/", base_url).as_str()))
        .and(header("accept-language", "en-US,en;q=0.5"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>series</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (scheduler, clock) = manual_scheduler(&config);
    let body = scheduler
        .fetch(&format!("{}/series/solo-leveling", base_url))
        .await
        .expect("Fetch failed");

    assert_eq!(body, "<html>series</html>");
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_rate_limited_until_retries_exhausted() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let (scheduler, clock) = manual_scheduler(&config);
    let result = scheduler
        .fetch_with_retries(&format!("{}/latest", mock_server.uri()), 2)
        .await;

    match result {
        Err(FetchError::RetriesExhausted {
            attempts,
            last_cause,
            ..
        }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last_cause, FetchError::RateLimited { .. }));
        }
        other => panic!("Expected RetriesExhausted, got {:?}", other),
    }

    assert_eq!(request_count(&mock_server).await, 3);

    // Two jittered backoffs; the backoff already covers the pacing interval
    let sleeps = clock.sleeps();
    assert_eq!(sleeps.len(), 2);
    for sleep in sleeps {
        assert!(sleep >= Duration::from_millis(2000));
        assert!(sleep <= Duration::from_millis(3000));
    }
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let (scheduler, clock) = manual_scheduler(&config);
    let result = scheduler
        .fetch(&format!("{}/series/missing", mock_server.uri()))
        .await;

    assert!(matches!(result, Err(FetchError::Client { status: 404, .. })));
    assert_eq!(request_count(&mock_server).await, 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_internal_server_error_is_not_retried() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let (scheduler, _clock) = manual_scheduler(&config);
    let result = scheduler.fetch(&mock_server.uri()).await;

    assert!(matches!(result, Err(FetchError::Client { status: 500, .. })));
    assert_eq!(request_count(&mock_server).await, 1);
}

#[tokio::test]
async fn test_service_unavailable_then_success() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/chapter/1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/chapter/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pages"))
        .mount(&mock_server)
        .await;

    let (scheduler, clock) = manual_scheduler(&config);
    let body = scheduler
        .fetch(&format!("{}/chapter/1", mock_server.uri()))
        .await
        .expect("Fetch failed");

    assert_eq!(body, "pages");
    assert_eq!(request_count(&mock_server).await, 2);
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(1000)]);
}

#[tokio::test]
async fn test_gateway_timeout_with_zero_retries() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(504))
        .mount(&mock_server)
        .await;

    let (scheduler, _clock) = manual_scheduler(&config);
    let result = scheduler.fetch_with_retries(&mock_server.uri(), 0).await;

    match result {
        Err(FetchError::RetriesExhausted {
            attempts,
            last_cause,
            ..
        }) => {
            assert_eq!(attempts, 1);
            assert!(matches!(
                *last_cause,
                FetchError::ServerUnavailable { status: 504, .. }
            ));
        }
        other => panic!("Expected RetriesExhausted, got {:?}", other),
    }
    assert_eq!(request_count(&mock_server).await, 1);
}

#[tokio::test]
async fn test_timeout_is_retried() {
    let mock_server = MockServer::start().await;
    let mut config = create_test_config(&mock_server.uri());
    config.fetcher.timeout_ms = 200;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&mock_server)
        .await;

    let (scheduler, clock) = manual_scheduler(&config);
    let result = scheduler.fetch_with_retries(&mock_server.uri(), 1).await;

    match result {
        Err(FetchError::RetriesExhausted {
            attempts,
            last_cause,
            ..
        }) => {
            assert_eq!(attempts, 2);
            assert!(matches!(
                *last_cause,
                FetchError::Transport {
                    kind: TransportErrorKind::Timeout,
                    ..
                }
            ));
        }
        other => panic!("Expected RetriesExhausted, got {:?}", other),
    }
    assert_eq!(request_count(&mock_server).await, 2);
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(1000)]);
}

#[tokio::test]
async fn test_refused_connection_is_not_retried() {
    // Reserve a port, then free it so nothing is listening there
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
        listener.local_addr().expect("No local address").port()
    };
    let base_url = format!("http://127.0.0.1:{}", port);
    let config = create_test_config(&base_url);

    let (scheduler, clock) = manual_scheduler(&config);
    let result = scheduler.fetch(&base_url).await;

    assert!(matches!(
        result,
        Err(FetchError::Transport {
            kind: TransportErrorKind::Other,
            ..
        })
    ));
    assert!(clock.sleeps().is_empty());
}

/// Starts a server that reads each request and then resets the connection
///
/// Returns its base URL and a counter of accepted connections.
async fn start_resetting_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }

            // Closing with a zero linger sends RST instead of FIN
            let _ = stream.set_linger(Some(Duration::ZERO));
            drop(stream);
        }
    });

    (format!("http://{}", addr), accepted)
}

#[tokio::test]
async fn test_connection_reset_is_retried() {
    let (base_url, accepted) = start_resetting_server().await;
    let config = create_test_config(&base_url);

    let (scheduler, clock) = manual_scheduler(&config);
    let result = scheduler
        .fetch_with_retries(&format!("{}/chapter/1", base_url), 2)
        .await;

    match result {
        Err(FetchError::RetriesExhausted {
            attempts,
            last_cause,
            ..
        }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(
                *last_cause,
                FetchError::Transport {
                    kind: TransportErrorKind::ConnectionReset,
                    ..
                }
            ));
        }
        other => panic!("Expected RetriesExhausted, got {:?}", other),
    }

    assert_eq!(accepted.load(Ordering::SeqCst), 3);
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_millis(1000), Duration::from_millis(1000)]
    );
}

#[tokio::test]
async fn test_per_request_referer_override() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let config = create_test_config(&base_url);
    let series_url = format!("{}/some-series", base_url);

    Mock::given(method("GET"))
        .and(path("/some-series/chapter-1"))
        .and(header("referer", series_url.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("chapter"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert(
        REFERER,
        HeaderValue::from_str(&series_url).expect("Invalid header value"),
    );
    let options = FetchOptions::default().with_headers(headers);

    let (scheduler, _clock) = manual_scheduler(&config);
    let body = scheduler
        .fetch_with_options(&format!("{}/chapter-1", series_url), &options)
        .await
        .expect("Fetch failed");

    assert_eq!(body, "chapter");
}

#[tokio::test]
async fn test_back_to_back_fetches_are_paced() {
    let mock_server = MockServer::start().await;
    let mut config = create_test_config(&mock_server.uri());
    config.fetcher.min_interval_ms = 150;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let scheduler = RequestScheduler::new(&config).expect("Failed to create scheduler");
    let started = Instant::now();
    for page in 1..=3 {
        scheduler
            .fetch(&format!("{}/page/{}", mock_server.uri(), page))
            .await
            .expect("Fetch failed");
    }

    // Three requests need at least two full intervals between them
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(request_count(&mock_server).await, 3);
}

#[tokio::test]
async fn test_schedulers_sharing_a_pacer_are_paced_together() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let (first, clock) = manual_scheduler(&config);
    let second = RequestScheduler::with_pacer(&config, first.pacer().clone())
        .expect("Failed to create scheduler");

    first.fetch(&mock_server.uri()).await.expect("Fetch failed");
    second.fetch(&mock_server.uri()).await.expect("Fetch failed");

    // The second scheduler waited out the interval the first one started
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
}
