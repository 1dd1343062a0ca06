use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::rate_limit::RateLimitPolicy;
use crate::state::Policies;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "experiment-gateway")]
#[command(about = "Rate-limited A/B variant assignment for the marketing site")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Experiments TOML file; built-in experiments when omitted
    #[arg(short, long)]
    pub experiments: Option<PathBuf>,

    // Rate limit window in seconds (all endpoints)
    #[arg(long, default_value_t = 60)]
    pub rate_window_secs: u64,

    // Contact form submissions per window
    #[arg(long, default_value_t = 3)]
    pub contact_rate_limit: u32,

    // Result tracking events per window
    #[arg(long, default_value_t = 50)]
    pub track_rate_limit: u32,

    // Variant lookups per window
    #[arg(long, default_value_t = 100)]
    pub variant_rate_limit: u32,

    // Sweep expired rate limit windows every N seconds, 0 disables
    #[arg(long, default_value_t = 0)]
    pub sweep_interval_secs: u64,
}

impl Args {
    pub fn policies(&self) -> Policies {
        let window = Duration::from_secs(self.rate_window_secs);
        Policies {
            contact: RateLimitPolicy::new(self.contact_rate_limit, window),
            track: RateLimitPolicy::new(self.track_rate_limit, window),
            variant: RateLimitPolicy::new(self.variant_rate_limit, window),
        }
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}
