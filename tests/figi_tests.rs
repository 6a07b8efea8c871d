// tests/figi_tests.rs
use isin_enrich::config::FigiConfig;
use isin_enrich::figi::FigiClient;
use isin_enrich::pipeline::{default_mapping_requests, export_figi};
use isin_enrich::types::MappingRequest;
use mockito::Matcher;
use serde_json::json;

const MAPPING_RESPONSE: &str = r#"[
    {"data": [{"figi": "BBG000B9XRY4", "name": "APPLE INC", "ticker": "AAPL", "exchCode": "US"}]},
    {"data": [{"figi": "BBG000BPH459", "name": "MICROSOFT CORP", "ticker": "MSFT", "exchCode": "US"}]},
    {"warning": "No identifier found."}
]"#;

fn client_for(server: &mockito::ServerGuard) -> FigiClient {
    let config = FigiConfig::new(format!("{}/v3/mapping", server.url()), "test-key".to_string()).unwrap();
    FigiClient::new(config)
}

#[tokio::test]
async fn successful_lookup_returns_one_row_per_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/mapping")
        .match_header("content-type", "text/json")
        .match_header("x-openfigi-apikey", "test-key")
        .match_body(Matcher::Json(json!([
            {"idType": "ID_ISIN", "idValue": "US0378331005", "exchCode": "US", "currency": "USD"},
            {"idType": "ID_ISIN", "idValue": "US5949181045", "exchCode": "US", "currency": "USD"},
            {"idType": "ID_ISIN", "idValue": "DE0008469008", "exchCode": "GF", "currency": "EUR"}
        ])))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(MAPPING_RESPONSE)
        .create_async()
        .await;

    let requests = default_mapping_requests();
    let table = client_for(&server).lookup(&requests).await.expect("lookup should succeed");

    mock.assert_async().await;
    assert_eq!(table.len(), requests.len());
    assert_eq!(table.columns, vec!["data", "warning"]);
    assert_eq!(table.cell(0, "data").unwrap()[0]["ticker"], json!("AAPL"));
}

#[tokio::test]
async fn non_success_status_yields_no_result() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/mapping")
        .with_status(401)
        .with_body("Invalid API key.")
        .create_async()
        .await;

    let result = client_for(&server)
        .lookup(&[MappingRequest::isin("US0378331005")])
        .await;

    mock.assert_async().await;
    assert!(result.is_none());
}

#[tokio::test]
async fn try_lookup_exposes_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v3/mapping")
        .with_status(429)
        .with_body("Too many requests")
        .create_async()
        .await;

    let err = client_for(&server)
        .try_lookup(&[MappingRequest::isin("US0378331005")])
        .await
        .unwrap_err();

    match err {
        isin_enrich::IsinError::Api { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "Too many requests");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn malformed_body_yields_no_result() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v3/mapping")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let result = client_for(&server)
        .lookup(&[MappingRequest::isin("US0378331005")])
        .await;

    assert!(result.is_none());
}

#[tokio::test]
async fn transport_failure_yields_no_result() {
    let config = FigiConfig::new("http://127.0.0.1:1/v3/mapping".to_string(), "test-key".to_string()).unwrap();
    let result = FigiClient::new(config)
        .lookup(&[MappingRequest::isin("US0378331005")])
        .await;
    assert!(result.is_none());
}

#[tokio::test]
async fn export_writes_spreadsheet_on_success() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v3/mapping")
        .with_status(200)
        .with_body(MAPPING_RESPONSE)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("figi_output.xlsx");

    let written = export_figi(&client_for(&server), &default_mapping_requests(), &path)
        .await
        .unwrap();

    let (table, written_path) = written.expect("a table should be written");
    assert_eq!(table.len(), 3);
    assert_eq!(written_path, path);
    let metadata = std::fs::metadata(&path).unwrap();
    assert!(metadata.len() > 0);
}

#[tokio::test]
async fn export_skips_file_when_lookup_fails() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v3/mapping")
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("figi_output.xlsx");

    let written = export_figi(&client_for(&server), &default_mapping_requests(), &path)
        .await
        .unwrap();

    assert!(written.is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn empty_request_list_is_not_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/mapping")
        .with_status(200)
        .with_body("[]")
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.try_lookup(&[]).await.unwrap_err();
    assert!(matches!(err, isin_enrich::IsinError::EmptyRequests));
    assert!(client.lookup(&[]).await.is_none());

    mock.assert_async().await;
}
