use tracing::{debug, error, info, warn};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

pub struct Logger;

impl Logger {
    /// Install the global subscriber. `RUST_LOG` wins over the default filter.
    pub fn init() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("packline=info"));

        // A second init (tests, embedding) is not an error
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }

    pub fn build_start(entry: &str, outdir: &str, generation: u64) {
        info!("🔨 packline build #{}", generation);
        info!("📁 Entry: {}", entry);
        info!("📦 Output: {}", outdir);
    }

    pub fn visiting_asset(path: &str, pipeline: &str) {
        debug!("🔍 Visiting: {} ({})", path, pipeline);
    }

    pub fn resolved(specifier: &str, path: &str) {
        debug!("🔗 Resolved '{}' -> {}", specifier, path);
    }

    pub fn walk_complete(asset_count: usize, modules: usize, resources: usize) {
        info!(
            "📦 Walked {} assets ({} modules, {} resources)",
            asset_count, modules, resources
        );
    }

    pub fn build_complete(artifacts: usize, build_time: std::time::Duration, outdir: &str) {
        info!("✅ Wrote {} artifacts to {} in {:.2?}", artifacts, outdir, build_time);
    }

    pub fn info(msg: &str) {
        info!("{}", msg);
    }

    pub fn debug(msg: &str) {
        debug!("{}", msg);
    }

    pub fn error(msg: &str) {
        error!("❌ {}", msg);
    }

    pub fn warn(msg: &str) {
        warn!("⚠️  {}", msg);
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        debug!("⏱️  Starting: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!("⏱️  Completed: {} in {:.2?}", self.name, self.elapsed());
    }
}
