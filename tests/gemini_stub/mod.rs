use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::Value;

pub const STUB_API_KEY: &str = "stub-key";

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Answer every prompt with this text as the first candidate part.
    Reply(String),
    /// Answer with a Gemini-style error envelope.
    Error { status: u16, message: String },
    /// Answer 200 with an envelope that has no candidates.
    NoCandidates,
}

pub struct GeminiStub {
    pub api_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl GeminiStub {
    pub fn spawn(behavior: StubBehavior) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start gemini stub server");
        let addr = server.server_addr();
        let api_url = format!("http://{addr}/v1beta/models/gemini-stub:generateContent");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
                if request.method() != &tiny_http::Method::Post
                    || path != "/v1beta/models/gemini-stub:generateContent"
                {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }
                if !query.split('&').any(|pair| pair == format!("key={STUB_API_KEY}")) {
                    let _ = request.respond(json_response(
                        401,
                        &error_envelope(401, "API key not valid"),
                    ));
                    continue;
                }
                let bearer = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.as_str().to_owned())
                    .unwrap_or_default();
                if bearer != format!("Bearer {STUB_API_KEY}") {
                    let _ = request.respond(json_response(
                        401,
                        &error_envelope(401, "missing or invalid bearer token"),
                    ));
                    continue;
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }

                let parsed: Value = match serde_json::from_str(&body) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid json").with_status_code(400),
                        );
                        continue;
                    }
                };

                let has_prompt = parsed
                    .pointer("/contents/0/parts/0/text")
                    .and_then(|v| v.as_str())
                    .is_some_and(|text| !text.is_empty());
                let has_config = parsed.pointer("/generationConfig/maxOutputTokens").is_some();
                if !has_prompt || !has_config {
                    let _ = request.respond(json_response(
                        400,
                        &error_envelope(400, "missing contents or generationConfig"),
                    ));
                    continue;
                }

                let response = match &behavior {
                    StubBehavior::Reply(text) => json_response(
                        200,
                        &serde_json::json!({
                            "candidates": [
                                {
                                    "content": {
                                        "role": "model",
                                        "parts": [ { "text": text } ]
                                    },
                                    "finishReason": "STOP"
                                }
                            ]
                        }),
                    ),
                    StubBehavior::Error { status, message } => {
                        json_response(*status, &error_envelope(*status, message))
                    }
                    StubBehavior::NoCandidates => {
                        json_response(200, &serde_json::json!({ "candidates": [] }))
                    }
                };
                let _ = request.respond(response);
            }
        });

        Self {
            api_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for GeminiStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn error_envelope(status: u16, message: &str) -> Value {
    serde_json::json!({
        "error": {
            "code": status,
            "message": message,
            "status": "STUB_ERROR"
        }
    })
}

fn json_response(status: u16, body: &Value) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("build header");
    tiny_http::Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(header)
}

/// A model reply in the delimited slide format.
#[allow(dead_code)]
pub fn sample_reply() -> String {
    [
        "===== 슬라이드 1 =====",
        "제목: Rust 소개",
        "내용:",
        "- 안전성",
        "- 성능",
        "",
        "===== 슬라이드 2 =====",
        "제목: 소유권",
        "내용:",
        "- move",
        "- borrow",
        "발표자 노트: 예제를 보여준다",
        "",
        "===== 슬라이드 3 =====",
        "제목: 감사합니다",
        "내용: 질문 받습니다",
    ]
    .join("\n")
}
