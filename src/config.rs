use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TICK_MS: u64 = 800;
const DEFAULT_WINDOW_SECS: u64 = 15;
const DEFAULT_PLAY_BUDGET: usize = 48;
const DEFAULT_NARRATION_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub tick_interval: Duration,
    pub window_duration: Duration,
    /// Clutch threshold as a fraction of the prop line. Zero fires on a
    /// tracked player's first fourth-quarter involvement.
    pub clutch_fraction: f64,
    pub play_budget: usize,
    pub seed: Option<u64>,
    pub narration_url: Option<String>,
    pub narration_api_key: Option<String>,
    pub narration_model: Option<String>,
    pub narration_timeout: Duration,
    pub log_dir: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            window_duration: Duration::from_secs(DEFAULT_WINDOW_SECS),
            clutch_fraction: 0.0,
            play_budget: DEFAULT_PLAY_BUDGET,
            seed: None,
            narration_url: None,
            narration_api_key: None,
            narration_model: None,
            narration_timeout: Duration::from_secs(DEFAULT_NARRATION_TIMEOUT_SECS),
            log_dir: None,
        }
    }
}

impl SimConfig {
    pub fn from_env() -> Self {
        let tick_ms = env_parse::<u64>("SIM_TICK_MS")
            .unwrap_or(DEFAULT_TICK_MS)
            .clamp(50, 10_000);
        let window_secs = env_parse::<u64>("SIM_WINDOW_SECS")
            .unwrap_or(DEFAULT_WINDOW_SECS)
            .clamp(1, 300);
        let clutch_fraction = env_parse::<f64>("SIM_CLUTCH_FRACTION")
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 2.0);
        let play_budget = env_parse::<usize>("SIM_PLAY_BUDGET")
            .unwrap_or(DEFAULT_PLAY_BUDGET)
            .clamp(40, 55);
        let narration_timeout = env_parse::<u64>("NARRATION_TIMEOUT_SECS")
            .unwrap_or(DEFAULT_NARRATION_TIMEOUT_SECS)
            .clamp(1, 120);

        Self {
            tick_interval: Duration::from_millis(tick_ms),
            window_duration: Duration::from_secs(window_secs),
            clutch_fraction,
            play_budget,
            seed: env_parse::<u64>("SIM_SEED"),
            narration_url: opt_env("NARRATION_URL"),
            narration_api_key: opt_env("NARRATION_API_KEY"),
            narration_model: opt_env("NARRATION_MODEL"),
            narration_timeout: Duration::from_secs(narration_timeout),
            log_dir: opt_env("SIM_LOG_DIR").map(PathBuf::from),
        }
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    opt_env(key).and_then(|val| val.parse::<T>().ok())
}
