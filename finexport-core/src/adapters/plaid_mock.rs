//! Mock Plaid API server for testing
//!
//! Simulates the subset of the Plaid API the exporter calls, so the HTTP
//! client can be exercised end to end without Plaid credentials:
//! - POST /item/public_token/exchange (each public token redeems once)
//! - POST /accounts/get
//! - POST /transactions/get (honours options.count / options.offset)
//! - POST /institutions/get_by_id

use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value as JsonValue};

/// Mock Plaid server for testing
pub struct MockPlaidServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<MockState>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Configuration for mock data generation
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub num_accounts: usize,
    /// Total reported by /transactions/get
    pub total_transactions: usize,
    /// Transactions actually served; less than the total simulates a lying server
    pub served_transactions: Option<usize>,
    /// Institution IDs the server recognises
    pub known_institutions: Vec<String>,
    /// Whether to simulate rate limiting
    pub rate_limit: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            num_accounts: 2,
            total_transactions: 3,
            served_transactions: None,
            known_institutions: vec!["ins_3".to_string(), "ins_130893".to_string()],
            rate_limit: false,
        }
    }
}

/// Requests seen by the server
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub path: String,
    pub body: JsonValue,
}

#[derive(Default)]
struct MockState {
    redeemed: Mutex<HashSet<String>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockPlaidServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(MockState::default());

        // Non-blocking so the loop can observe shutdown
        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let state_clone = state.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let _ = stream.set_nonblocking(false);
                        handle_connection(stream, &config, &state_clone);
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    /// Get the base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Requests received for one path
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockPlaidServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read one HTTP request: (request line, headers, body)
fn read_request(stream: &mut TcpStream) -> Option<(String, String, Vec<u8>)> {
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or("").to_string();
    let headers = lines.collect::<Vec<_>>().join("\n");
    let body = data[header_end..].to_vec();
    Some((request_line, headers, body))
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, state: &MockState) {
    let Some((request_line, headers, body)) = read_request(&mut stream) else {
        return;
    };

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, "Bad Request", &error_body("INVALID_REQUEST", "INVALID_BODY"));
        return;
    }
    let (method, path) = (parts[0], parts[1].to_string());
    let body: JsonValue = serde_json::from_slice(&body).unwrap_or(JsonValue::Null);

    state.requests.lock().unwrap().push(RecordedRequest {
        path: path.clone(),
        body: body.clone(),
    });

    let headers_lower = headers.to_lowercase();
    if !headers_lower.contains("plaid-client-id: test_client")
        || !headers_lower.contains("plaid-secret: test_secret")
    {
        send_response(
            &mut stream,
            400,
            "Bad Request",
            &error_body("INVALID_INPUT", "INVALID_API_KEYS"),
        );
        return;
    }

    if config.rate_limit {
        send_response(
            &mut stream,
            429,
            "Too Many Requests",
            &error_body("RATE_LIMIT_EXCEEDED", "RATE_LIMIT"),
        );
        return;
    }

    if method != "POST" {
        send_response(&mut stream, 405, "Method Not Allowed", r#"{"error": "Method not allowed"}"#);
        return;
    }

    let (status, text, payload) = match path.as_str() {
        "/item/public_token/exchange" => exchange(&body, state),
        "/accounts/get" => accounts(&body, config),
        "/transactions/get" => transactions(&body, config),
        "/institutions/get_by_id" => institution(&body, config),
        _ => (404, "Not Found", r#"{"error": "Endpoint not found"}"#.to_string()),
    };
    send_response(&mut stream, status, text, &payload);
}

fn exchange(body: &JsonValue, state: &MockState) -> (u16, &'static str, String) {
    let token = body["public_token"].as_str().unwrap_or("");
    if !token.starts_with("public-") {
        return (400, "Bad Request", error_body("INVALID_INPUT", "INVALID_PUBLIC_TOKEN"));
    }
    if !state.redeemed.lock().unwrap().insert(token.to_string()) {
        return (400, "Bad Request", error_body("INVALID_INPUT", "INVALID_PUBLIC_TOKEN"));
    }
    let suffix = token.trim_start_matches("public-");
    (
        200,
        "OK",
        json!({
            "access_token": format!("access-{}", suffix),
            "item_id": format!("item-{}", suffix),
            "request_id": "req-exchange"
        })
        .to_string(),
    )
}

fn authorized(body: &JsonValue) -> bool {
    body["access_token"]
        .as_str()
        .map(|t| t.starts_with("access-"))
        .unwrap_or(false)
}

fn accounts(body: &JsonValue, config: &MockConfig) -> (u16, &'static str, String) {
    if !authorized(body) {
        return (400, "Bad Request", error_body("INVALID_INPUT", "INVALID_ACCESS_TOKEN"));
    }
    let accounts: Vec<JsonValue> = (0..config.num_accounts)
        .map(|i| {
            json!({
                "account_id": format!("acc_{}", i + 1),
                "balances": {"available": 100 + i, "current": 110 + i, "iso_currency_code": "USD"},
                "mask": format!("{:04}", i + 1),
                "name": format!("Checking {}", i + 1),
                "official_name": null,
                "subtype": "checking",
                "type": "depository"
            })
        })
        .collect();
    (200, "OK", json!({ "accounts": accounts, "request_id": "req-accounts" }).to_string())
}

fn transactions(body: &JsonValue, config: &MockConfig) -> (u16, &'static str, String) {
    if !authorized(body) {
        return (400, "Bad Request", error_body("INVALID_INPUT", "INVALID_ACCESS_TOKEN"));
    }
    let count = body["options"]["count"].as_u64().unwrap_or(100) as usize;
    let offset = body["options"]["offset"].as_u64().unwrap_or(0) as usize;
    let served = config
        .served_transactions
        .unwrap_or(config.total_transactions)
        .min(config.total_transactions);
    let date = body["end_date"].as_str().unwrap_or("2024-01-31").to_string();

    let page: Vec<JsonValue> = (offset..served.min(offset + count).max(offset))
        .map(|i| {
            json!({
                "transaction_id": format!("tx_{}", i + 1),
                "account_id": "acc_1",
                "amount": 12.5 + i as f64,
                "date": date,
                "name": format!("Merchant {}", i + 1),
                "pending": false,
                "category": ["Food and Drink", "Restaurants"]
            })
        })
        .collect();
    (
        200,
        "OK",
        json!({
            "accounts": [],
            "transactions": page,
            "total_transactions": config.total_transactions,
            "request_id": "req-transactions"
        })
        .to_string(),
    )
}

fn institution(body: &JsonValue, config: &MockConfig) -> (u16, &'static str, String) {
    let id = body["institution_id"].as_str().unwrap_or("");
    if !config.known_institutions.iter().any(|known| known == id) {
        return (400, "Bad Request", error_body("INVALID_INPUT", "INVALID_INSTITUTION"));
    }
    (
        200,
        "OK",
        json!({
            "institution": {
                "institution_id": id,
                "name": format!("Institution {}", id),
                "country_codes": body["country_codes"].clone(),
                "products": ["transactions"]
            },
            "request_id": "req-institution"
        })
        .to_string(),
    )
}

fn error_body(error_type: &str, error_code: &str) -> String {
    json!({
        "error_type": error_type,
        "error_code": error_code,
        "error_message": format!("mock {}", error_code.to_lowercase()),
        "display_message": null,
        "request_id": "req-error"
    })
    .to_string()
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::plaid::PlaidClient;
    use crate::config::PlaidConfig;
    use crate::domain::result::Error;
    use crate::ports::DataProvider;
    use secrecy::ExposeSecret;
    use chrono::NaiveDate;

    fn client_for(server: &MockPlaidServer) -> PlaidClient {
        let config = PlaidConfig {
            base_url: Some(server.base_url()),
            ..PlaidConfig::new("test_client", "test_secret")
        };
        PlaidClient::new(&config).unwrap()
    }

    fn window() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn test_exchange_and_fetch_accounts() {
        let server = MockPlaidServer::start(MockConfig {
            num_accounts: 3,
            ..Default::default()
        })
        .unwrap();
        let client = client_for(&server);

        let token = client.exchange_public_token("public-sandbox-1").unwrap();
        assert_eq!(token.expose_secret(), "access-sandbox-1");

        let accounts = client.fetch_accounts(&token).unwrap();
        assert_eq!(accounts.len(), 3);
        assert_eq!(accounts[0]["account_id"], json!("acc_1"));
        assert!(accounts[0]["balances"].is_object());
    }

    #[test]
    fn test_redeemed_token_fails() {
        let server = MockPlaidServer::start(MockConfig::default()).unwrap();
        let client = client_for(&server);

        client.exchange_public_token("public-once").unwrap();
        let second = client.exchange_public_token("public-once");
        assert!(matches!(second, Err(Error::AuthExchange(_))));
    }

    #[test]
    fn test_invalid_token_fails() {
        let server = MockPlaidServer::start(MockConfig::default()).unwrap();
        let client = client_for(&server);

        let result = client.exchange_public_token("not-a-token");
        assert!(matches!(result, Err(Error::AuthExchange(_))));
    }

    #[test]
    fn test_paginated_transactions() {
        let server = MockPlaidServer::start(MockConfig {
            total_transactions: 1200,
            ..Default::default()
        })
        .unwrap();
        let client = client_for(&server);
        let (start, end) = window();

        let token = client.exchange_public_token("public-paged").unwrap();
        let txs = client.fetch_transactions(&token, start, end, 500).unwrap();

        assert_eq!(txs.len(), 1200);
        let offsets: Vec<u64> = server
            .requests_to("/transactions/get")
            .iter()
            .map(|r| r.body["options"]["offset"].as_u64().unwrap())
            .collect();
        assert_eq!(offsets, vec![0, 500, 1000]);

        let first = &server.requests_to("/transactions/get")[0];
        assert_eq!(first.body["start_date"], json!("2024-01-01"));
        assert_eq!(first.body["end_date"], json!("2024-01-31"));
        assert_eq!(first.body["options"]["count"], json!(500));
    }

    #[test]
    fn test_inconsistent_total_terminates() {
        let server = MockPlaidServer::start(MockConfig {
            total_transactions: 50,
            served_transactions: Some(20),
            ..Default::default()
        })
        .unwrap();
        let client = client_for(&server);
        let (start, end) = window();

        let token = client.exchange_public_token("public-liar").unwrap();
        let result = client.fetch_transactions(&token, start, end, 10);

        assert!(matches!(result, Err(Error::Pagination(_))));
        assert_eq!(server.requests_to("/transactions/get").len(), 5);
    }

    #[test]
    fn test_institution_metadata() {
        let server = MockPlaidServer::start(MockConfig::default()).unwrap();
        let client = client_for(&server);

        let metadata = client.fetch_institution_metadata("ins_3").unwrap();
        assert_eq!(metadata["institution_id"], json!("ins_3"));
        assert_eq!(metadata["country_codes"], json!(["US"]));

        let missing = client.fetch_institution_metadata("ins_999");
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_rate_limit() {
        let server = MockPlaidServer::start(MockConfig {
            rate_limit: true,
            ..Default::default()
        })
        .unwrap();
        let client = client_for(&server);

        let result = client.exchange_public_token("public-throttled");
        assert!(matches!(result, Err(Error::RateLimit(_))));
    }

    #[test]
    fn test_bad_credentials_are_transport_errors() {
        let server = MockPlaidServer::start(MockConfig::default()).unwrap();
        let config = PlaidConfig {
            base_url: Some(server.base_url()),
            ..PlaidConfig::new("wrong_client", "wrong_secret")
        };
        let client = PlaidClient::new(&config).unwrap();

        let result = client.fetch_institution_metadata("ins_3");
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
