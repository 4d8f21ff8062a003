// Suggestion client tests against a local HTTP stub
//
// Each test binds a one-shot server on 127.0.0.1, points the client at it
// and checks both the outgoing request and how the response is handled.

use image::{Rgba, RgbaImage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use inkstamp::suggest::*;

/// Serve a single HTTP response and hand back the raw request.
async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/v1beta", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut chunk = [0u8; 8192];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            request.extend_from_slice(&chunk[..n]);
            if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        while request.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        String::from_utf8_lossy(&request).into_owned()
    });

    (endpoint, handle)
}

fn client_for(endpoint: String) -> SuggestionClient {
    SuggestionClient::new(SuggestionConfig {
        api_key: Some("test-key".to_string()),
        endpoint,
        timeout_seconds: 5,
        ..SuggestionConfig::default()
    })
    .unwrap()
}

fn photo() -> RgbaImage {
    RgbaImage::from_fn(800, 600, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255]))
}

fn model_response(text: &str) -> String {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
    .to_string()
}

#[tokio::test]
async fn test_successful_request() {
    let text = r#"{"suggestions": ["Golden Hour", "Sunset Studio", "Coastline", "Dusk", "Tide", "Extra"]}"#;
    let (endpoint, server) = serve_once("200 OK", model_response(text)).await;
    let client = client_for(endpoint);

    let suggestions = client.request(&photo(), Language::En).await.unwrap();
    assert_eq!(
        suggestions,
        vec!["Golden Hour", "Sunset Studio", "Coastline", "Dusk", "Tide"]
    );

    let request = server.await.unwrap();
    let lower = request.to_lowercase();
    assert!(lower.starts_with("post /v1beta/models/gemini-2.5-flash:generatecontent "));
    assert!(lower.contains("x-goog-api-key: test-key"));

    // Body carries the snapshot and the English instruction
    let body_start = request.find("\r\n\r\n").unwrap() + 4;
    let body: serde_json::Value = serde_json::from_str(&request[body_start..]).unwrap();
    assert_eq!(
        body["contents"][0]["parts"][0]["inlineData"]["mimeType"],
        "image/jpeg"
    );
    assert!(body["contents"][0]["parts"][1]["text"]
        .as_str()
        .unwrap()
        .ends_with("Keep them under 5 words."));
}

#[tokio::test]
async fn test_error_status_falls_back() {
    let (endpoint, server) = serve_once("500 Internal Server Error", "{}".to_string()).await;
    let client = client_for(endpoint);

    let result = client.request(&photo(), Language::En).await;
    assert!(matches!(result, Err(SuggestError::Status(500))));
    server.await.unwrap();

    let (endpoint, server) = serve_once("429 Too Many Requests", "{}".to_string()).await;
    let suggestions = client_for(endpoint).suggest(&photo(), Language::En).await;
    assert_eq!(suggestions, fallback_suggestions(Language::En));
    server.await.unwrap();
}

#[tokio::test]
async fn test_malformed_model_text_falls_back() {
    let (endpoint, server) = serve_once("200 OK", model_response("Here are some ideas!")).await;
    let suggestions = client_for(endpoint).suggest(&photo(), Language::Zh).await;

    assert_eq!(suggestions, fallback_suggestions(Language::Zh));
    server.await.unwrap();
}

#[tokio::test]
async fn test_empty_list_is_returned_as_is() {
    let (endpoint, server) =
        serve_once("200 OK", model_response(r#"{"suggestions": []}"#)).await;
    let suggestions = client_for(endpoint).suggest(&photo(), Language::En).await;

    assert!(suggestions.is_empty());
    server.await.unwrap();
}

#[tokio::test]
async fn test_service_releases_slot_after_request() {
    let text = r#"{"suggestions": ["版权所有", "摄影作品"]}"#;
    let (endpoint, server) = serve_once("200 OK", model_response(text)).await;
    let service = SuggestionService::new(client_for(endpoint));

    let suggestions = service.suggest(&photo(), Language::Zh).await.unwrap();
    assert_eq!(suggestions, vec!["版权所有", "摄影作品"]);
    assert!(!service.is_busy());
    server.await.unwrap();
}
