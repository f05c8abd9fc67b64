//! OpenAI-compatible chat completions mock for local runs.
//!
//! Point a provider at it with e.g.
//! `GROQ_API_KEY=x GROQ_BASE_URL=http://localhost:8081/v1/chat/completions`.

use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: serde_json::Value,
}

#[derive(Clone)]
struct AppState {
    attempt_count: Arc<AtomicUsize>,
    fail_attempts: usize,
}

const ANALYSIS_REPLY: &str = r##"Sure! Here is the analysis you asked for:
```json
{
  "title": "Mock Site",
  "description": "Landing page with hero, features and contact form",
  "structure": {
    "layout": "single-column",
    "sections": [
      {"id": "header", "type": "navigation", "name": "Header", "description": "Logo and primary navigation"},
      {"id": "hero", "type": "hero", "name": "Hero", "description": "Headline with two calls to action"},
      {"id": "features", "type": "content", "name": "Features", "description": "Three feature cards"},
      {"id": "footer", "type": "footer", "name": "Footer", "description": "Links and copyright"}
    ]
  },
  "components": [
    {"name": "Header", "type": "layout", "description": "Sticky header", "props": [{"name": "logo", "type": "string", "required": false}], "dependencies": ["react"]},
    {"name": "FeatureCard", "type": "ui", "description": "Card with icon", "props": [{"name": "title", "type": "string", "required": true}], "dependencies": ["react", "lucide-react"]}
  ],
  "designSystem": {
    "tokens": [
      {"name": "primary", "category": "color", "value": "#2563EB"},
      {"name": "fontFamily", "category": "typography", "value": "Inter, sans-serif"}
    ]
  },
  "aiProvider": "mock",
  "timestamp": 0
}
```
Let me know if you need anything else."##;

const COMPONENTS_REPLY: &str = r##"Here are the components:
{"components": [
  {"name": "Header", "type": "layout", "description": "Sticky header",
   "code": "export const Header = ({ logo }: { logo?: string }) => { return <header>{logo && <img src={logo} alt=\"Logo\" />}</header>; };",
   "props": [{"name": "logo", "type": "string", "required": false}], "dependencies": ["react"]},
  {"name": "Footer", "type": "layout", "description": "Simple footer",
   "code": "export const Footer = () => <footer className=\"py-6\">Mock Site</footer>;",
   "props": [], "dependencies": ["react"]}
]}"##;

async fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buffer = [0u8; 16384];

    loop {
        let n = stream.read(&mut buffer).await.ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.trim()
                        .eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    Some(String::from_utf8_lossy(&data).into_owned())
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

async fn handle_connection(mut stream: TcpStream, state: AppState) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };

    let first_line = request.lines().next().unwrap_or("");
    log::debug!("Received request: {first_line}");

    if !first_line.starts_with("POST") || !first_line.contains("chat/completions") {
        respond(&mut stream, "404 Not Found", r#"{"error":"not found"}"#).await;
        return;
    }

    let body = request.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("");
    let req: ChatRequest = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("Failed to parse request JSON: {e}");
            let error = json!({ "error": e.to_string() }).to_string();
            respond(&mut stream, "400 Bad Request", &error).await;
            return;
        }
    };

    let attempt = state.attempt_count.fetch_add(1, Ordering::SeqCst) + 1;
    if attempt <= state.fail_attempts {
        log::info!("Attempt {attempt}: returning 503 to exercise retries");
        respond(&mut stream, "503 Service Unavailable", r#"{"error":"overloaded"}"#).await;
        return;
    }

    let prompt = req
        .messages
        .iter()
        .map(|m| m.content.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    let reply = if prompt.contains("component library") {
        COMPONENTS_REPLY
    } else {
        ANALYSIS_REPLY
    };
    log::info!("Attempt {attempt}: replying with {} chars", reply.len());

    let body = json!({
        "id": format!("mock-{attempt}"),
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": reply },
            "finish_reason": "stop",
        }],
    })
    .to_string();
    respond(&mut stream, "200 OK", &body).await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let port = std::env::var("MOCK_LLM_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8081);

    let fail_attempts = std::env::var("MOCK_LLM_FAIL_ATTEMPTS")
        .ok()
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(1);

    let state = AppState {
        attempt_count: Arc::new(AtomicUsize::new(0)),
        fail_attempts,
    };

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    log::info!("Mock LLM server listening on http://{addr}/v1/chat/completions");
    log::info!("Will fail the first {fail_attempts} attempt(s) with 503");

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let state = state.clone();
                tokio::spawn(async move {
                    handle_connection(stream, state).await;
                });
            }
            Err(e) => {
                log::error!("Error accepting connection: {e}");
            }
        }
    }
}
