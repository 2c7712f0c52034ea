//! Live text session with a tool.
//!
//! Connects to the Live API, asks a question that needs a tool, answers the
//! tool call and prints the streamed text reply.
//!
//! # Usage
//!
//! ```bash
//! export GOOGLE_API_KEY="your-api-key"   # or put it in .env
//! cargo run -p genai-live --example live_text
//! ```
//!
//! For Vertex AI set `GOOGLE_GENAI_USE_VERTEXAI=true`, `GOOGLE_CLOUD_PROJECT`,
//! `GOOGLE_CLOUD_LOCATION` and `VERTEX_ACCESS_TOKEN`.

use genai_live::{
    ChannelCallbacks, FunctionDeclaration, FunctionResponse, LiveClient, LiveConnectConfig,
    LiveEvent, ServerEvent, Tool,
};
use serde_json::json;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const MODEL: &str = "gemini-live-2.5-flash-preview";
const PROMPT: &str = "What time is it in Nairobi right now? Use the tool.";

async fn run() -> anyhow::Result<()> {
    let mut builder = LiveClient::builder();
    if let Ok(token) = std::env::var("VERTEX_ACCESS_TOKEN") {
        builder = builder.access_token(token);
    }
    let client = builder.build()?;

    let config = LiveConnectConfig::new()
        .with_text_output()
        .with_system_instruction("You are a concise assistant.")
        .with_tool(Tool::new(
            FunctionDeclaration::new("get_local_time", "Current local time in a city").with_parameters(
                json!({
                    "type": "object",
                    "properties": {"city": {"type": "string"}},
                    "required": ["city"]
                }),
            ),
        ));

    let (callbacks, mut events) = ChannelCallbacks::new();
    let session = client.connect(MODEL, config, Arc::new(callbacks)).await?;
    info!(session_id = session.session_id(), model = session.model(), "connected");

    session.send_client_content(PROMPT, true)?;
    tokio::time::timeout(Duration::from_secs(10), session.wait_for_setup()).await??;
    info!("setup complete");

    let mut stdout = std::io::stdout();
    loop {
        let event = match tokio::time::timeout(Duration::from_secs(30), events.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(_) => {
                warn!("timed out waiting for the model");
                break;
            }
        };

        match event {
            LiveEvent::Open => {}
            LiveEvent::Message(message) => {
                if let Some(text) = message.text() {
                    print!("{}", text);
                    stdout.flush()?;
                }
                match &message.event {
                    ServerEvent::ToolCall(call) => {
                        let responses = call
                            .function_calls
                            .iter()
                            .map(|fc| {
                                info!(name = %fc.name, args = %fc.args, "tool call");
                                FunctionResponse::for_call(fc, json!({"time": "14:05", "timezone": "EAT"}))
                            })
                            .collect();
                        session.send_tool_response(responses)?;
                    }
                    ServerEvent::ServerContent(content) if content.is_turn_complete() => {
                        println!();
                        info!(usage = ?message.usage_metadata, "turn complete");
                        break;
                    }
                    ServerEvent::GoAway(go_away) => {
                        warn!(time_left = ?go_away.time_left(), "server is going away");
                    }
                    _ => {}
                }
            }
            LiveEvent::Error(e) => error!(error = %e, "session error"),
            LiveEvent::Close(close) => {
                info!(code = ?close.code, reason = %close.reason, "session closed by server");
                return Ok(());
            }
        }
    }

    session.close();
    session.closed().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "live session failed");
            ExitCode::FAILURE
        }
    }
}
