//! Servidor de herramientas por stdio.
//!
//! Cada línea de entrada es `{"id": ..., "tool": "...", "arguments": {...}}`;
//! cada línea de salida es `{"id": ..., "response": {...}}`. Los logs van a
//! stderr para no mezclarse con el protocolo.
use chemjobs::{invoke_contained, AppConfig, ChemContext, CoreError, ToolError, ToolResponse};
use log::{error, info};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    tool: String,
    #[serde(default)]
    arguments: Value,
}

fn reply(id: Value, response: &ToolResponse) -> Result<String, CoreError> {
    Ok(serde_json::to_string(&json!({ "id": id, "response": response }))?)
}

async fn serve(ctx: Arc<ChemContext>, shutdown: CancellationToken) -> Result<(), CoreError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<(), std::io::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let request: Request = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                let response = ToolResponse::Error(ToolError::malformed_arguments("request", &e));
                let _ = tx.send(reply(Value::Null, &response)?);
                continue;
            }
        };
        // Cada petición corre aparte: una espera larga no bloquea a las demás.
        let ctx = ctx.clone();
        let tx = tx.clone();
        let cancel = shutdown.child_token();
        tokio::spawn(async move {
            let response = invoke_contained(ctx, request.tool.clone(), request.arguments, cancel).await;
            match reply(request.id, &response) {
                Ok(line) => {
                    let _ = tx.send(line);
                }
                Err(e) => error!("cannot encode response for {}: {e}", request.tool),
            }
        });
    }
    drop(tx);
    writer.await.map_err(|e| CoreError::Internal(e.to_string()))??;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).target(env_logger::Target::Stderr)
                                                                                     .init();
    let config = AppConfig::from_env()?;
    let ctx = Arc::new(ChemContext::from_config(&config)?);
    info!("chemjobs listening on stdio ({} tools)", chemjobs::TOOLS.len());

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; cancelling pending waits");
            signal.cancel();
        }
    });

    serve(ctx, shutdown).await
}
