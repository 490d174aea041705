use anyhow::{Context, Result};
use futures::StreamExt;
use std::{path::PathBuf, time::Duration};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::broadcast::{error::RecvError, Receiver},
};
use wayfinder_core::{http::HttpRequest, Wayfinder, WayfinderEvent};

use super::utils::{describe_event, print_error, print_info};

/// Options of the `fetch` subcommand.
pub struct FetchOptions {
    pub target: String,
    pub output: Option<PathBuf>,
    /// How long to wait for a background verification outcome after the body is written.
    pub verify_wait: Duration,
}

pub async fn resolve(wayfinder: &Wayfinder, target: &str) -> Result<()> {
    let resolution = wayfinder.resolve(target).await?;
    if let Some(gateway) = &resolution.gateway {
        print_info(&format!("gateway: {gateway}"));
    }
    println!("{}", resolution.target);
    Ok(())
}

pub async fn select(wayfinder: &Wayfinder, count: usize) -> Result<()> {
    for _ in 0..count.max(1) {
        println!("{}", wayfinder.select_gateway().await?);
    }
    Ok(())
}

pub async fn fetch(wayfinder: &Wayfinder, options: FetchOptions) -> Result<()> {
    let mut events = wayfinder.subscribe();

    let response = wayfinder.request(HttpRequest::get(&options.target).streaming()).await?;
    print_info(&format!("{} {}", response.status, response.url));

    let mut sink: Box<dyn AsyncWrite + Unpin + Send> = match &options.output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    let mut body = response.body.into_stream();
    let mut written = 0_usize;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        sink.write_all(&chunk).await?;
        written += chunk.len();
    }
    sink.flush().await?;
    print_info(&format!("{written} bytes written"));

    if wayfinder.verification_enabled() && !wayfinder.is_strict() {
        await_verification(&mut events, options.verify_wait).await;
    }
    wayfinder.shutdown();
    Ok(())
}

async fn await_verification(events: &mut Receiver<WayfinderEvent>, wait: Duration) {
    let outcome = tokio::time::timeout(wait, async {
        loop {
            match events.recv().await {
                Ok(event) if event.name().starts_with("verification") => return Some(event),
                Ok(event) => {
                    tracing::debug!(event = %serde_json::to_string(&event).unwrap_or_default(), "event");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped = skipped, "event subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
    .await;

    match outcome {
        Ok(Some(event)) => print_info(&describe_event(&event)),
        Ok(None) => print_error("event channel closed before verification finished"),
        Err(_) => print_error(&format!("no verification outcome within {}s", wait.as_secs())),
    }
}
