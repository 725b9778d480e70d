/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` selects the filter, `LOG_FORMAT=json` switches to JSON lines.
/// Fails if a global subscriber is already installed.
pub fn init_tracing() -> anyhow::Result<()> {
    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "recipebook=debug,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    let installed = if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("install tracing subscriber: {e}"))
}
