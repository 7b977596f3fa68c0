use tracing_subscriber::EnvFilter;

pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,paper_atlas=debug"))
    } else {
        EnvFilter::new("warn,paper_atlas=info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
