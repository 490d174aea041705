use wayfinder_core::WayfinderEvent;

// Status output goes to stderr so fetched bodies can be piped from stdout.

pub fn print_success(message: &str) {
    eprintln!("[SUCCESS] {message}");
}

pub fn print_error(message: &str) {
    eprintln!("[ERROR] {message}");
}

pub fn print_info(message: &str) {
    eprintln!("[INFO] {message}");
}

/// One-line summary of an event, e.g. `[verification-passed] tx=... strategy=hash`.
pub fn describe_event(event: &WayfinderEvent) -> String {
    let detail = match event {
        WayfinderEvent::RoutingSucceeded { context, strategy } => format!(
            "strategy={strategy} url={}",
            context.redirect_url.as_ref().map_or("-", |u| u.as_str())
        ),
        WayfinderEvent::RoutingFailed { error, .. } => format!("error={error}"),
        WayfinderEvent::VerificationPassed { tx_id, strategy, computed_hash, .. } => {
            format!("tx={tx_id} strategy={strategy} hash={computed_hash}")
        }
        WayfinderEvent::VerificationFailed { tx_id, error, .. } => {
            format!("tx={tx_id} error={error}")
        }
        WayfinderEvent::VerificationSkipped { reason, .. } => format!("reason={reason}"),
    };
    format!("[{}] {detail}", event.name())
}
