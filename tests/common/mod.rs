//! Shared utilities for integration and load testing.

use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use recoverable_rpc::session::{Credential, SessionType};
use recoverable_rpc::stub::{HttpLogin, ServiceStub};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

/// A request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub path: String,
    pub host: String,
    pub authorization: Option<String>,
    pub body: Value,
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F>(handler: F) -> SocketAddr
where
    F: Fn(MockRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = handler(request);
                        let status_text = match status {
                            200 => "200 OK",
                            401 => "401 Unauthorized",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request(socket: &mut TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let path = lines.next()?.split_whitespace().nth(1)?.to_string();

    let mut content_length = 0;
    let mut authorization = None;
    let mut host = String::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "authorization" => authorization = Some(value.trim().to_string()),
                "host" => host = value.trim().to_string(),
                _ => {}
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);
    Some(MockRequest {
        path,
        host,
        authorization,
        body,
    })
}

/// JSON-RPC fault response.
#[allow(dead_code)]
pub fn fault(code: &str, message: &str) -> (u16, String) {
    (500, json!({ "error": { "code": code, "message": message } }).to_string())
}

/// JSON-RPC fault response carried on a specific HTTP status.
#[allow(dead_code)]
pub fn fault_with_status(code: u16, fault_code: &str, message: &str) -> (u16, String) {
    (code, json!({ "error": { "code": fault_code, "message": message } }).to_string())
}

/// Bare HTTP status response.
#[allow(dead_code)]
pub fn status(code: u16, body: &str) -> (u16, String) {
    (code, body.to_string())
}

/// Login endpoint + record service with scripted failures.
///
/// `/login` hands out `sid-1`, `sid-2`, ... `/rpc` pops the next scripted
/// response, falling back to `{"result": default_result}`.
pub struct MockService {
    pub logins: AtomicU32,
    pub rpc_calls: AtomicU32,
    pub requests: Mutex<Vec<MockRequest>>,
    script: Mutex<VecDeque<(u16, String)>>,
    default_result: Value,
    reject_login: bool,
    /// Every token is good for exactly one successful call.
    single_use_tokens: bool,
    used_tokens: Mutex<HashSet<String>>,
}

impl MockService {
    pub fn new(default_result: Value) -> Self {
        Self {
            logins: AtomicU32::new(0),
            rpc_calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            default_result,
            reject_login: false,
            single_use_tokens: false,
            used_tokens: Mutex::new(HashSet::new()),
        }
    }

    #[allow(dead_code)]
    pub fn with_script(self, script: Vec<(u16, String)>) -> Self {
        *self.script.lock().unwrap() = script.into();
        self
    }

    #[allow(dead_code)]
    pub fn rejecting_logins(mut self) -> Self {
        self.reject_login = true;
        self
    }

    #[allow(dead_code)]
    pub fn with_single_use_tokens(mut self) -> Self {
        self.single_use_tokens = true;
        self
    }

    pub fn logins(&self) -> u32 {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn rpc_calls(&self) -> u32 {
        self.rpc_calls.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn last_rpc(&self) -> Option<MockRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn handle(&self, request: MockRequest) -> (u16, String) {
        match request.path.as_str() {
            "/login" => {
                if self.reject_login {
                    return status(401, r#"{"error":"INVALID_LOGIN"}"#);
                }
                let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
                let body = json!({
                    "serverUrl": format!("http://{}/rpc", request.host),
                    "sessionId": format!("sid-{n}"),
                    "userId": "005000000000001",
                });
                (200, body.to_string())
            }
            "/rpc" => {
                self.rpc_calls.fetch_add(1, Ordering::SeqCst);
                self.requests.lock().unwrap().push(request.clone());

                if self.single_use_tokens {
                    let token = request.authorization.clone().unwrap_or_default();
                    if !self.used_tokens.lock().unwrap().insert(token) {
                        return fault("INVALID_SESSION_ID", "Session expired or invalid");
                    }
                }

                if let Some(response) = self.script.lock().unwrap().pop_front() {
                    return response;
                }
                (200, json!({ "jsonrpc": "2.0", "result": self.default_result }).to_string())
            }
            _ => status(404, "not found"),
        }
    }
}

/// Serve `service` on an ephemeral port.
pub async fn start_mock_service(service: MockService) -> (SocketAddr, Arc<MockService>) {
    let service = Arc::new(service);
    let handler_service = service.clone();
    let addr = start_programmable_backend(move |request| handler_service.handle(request)).await;
    (addr, service)
}

/// Stub logging in against the mock at `addr` with a fast retry policy.
pub fn stub_for(addr: SocketAddr, session_type: SessionType) -> ServiceStub {
    let login_url = Url::parse(&format!("http://{}/login", addr)).unwrap();
    let login = HttpLogin::new(login_url, Duration::from_secs(5)).unwrap();
    ServiceStub::new(
        Credential::new("ops@example.com", "secret"),
        session_type,
        Arc::new(login),
    )
    .with_request_timeout(Duration::from_secs(5))
    .with_recovery(recoverable_rpc::config::RecoveryConfig {
        max_retries: 5,
        base_delay_ms: 10,
    })
}

/// Query result used as the default mock response.
#[allow(dead_code)]
pub fn sample_query_result() -> Value {
    json!({
        "done": true,
        "size": 1,
        "records": [{ "type": "Account", "id": "001000000000001", "Name": "Acme" }]
    })
}
