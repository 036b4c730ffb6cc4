use std::env;

pub const PROMPT_KEY: &'static str = "PS1";
pub const LOG_KEY: &'static str = "MINISH_LOG";
pub const DEFAULT_PROMPT: &'static str = "$ ";
pub const DEFAULT_LOG_FILTER: &'static str = "warn";

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Config {
	pub prompt: String,
	pub log_filter: String,
}

impl Config {
	pub fn from_env() -> Config {
		Config::from_lookup(|key| env::var(key).ok())
	}

	pub fn from_lookup<F>(lookup: F) -> Config where F: Fn(&str) -> Option<String> {
		Config {
			prompt: lookup(PROMPT_KEY).unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
			log_filter: lookup(LOG_KEY).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
		}
	}

	pub fn init_logging(&self) {
		let filter = tracing_subscriber::EnvFilter::try_new(&self.log_filter)
			.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
		let _ = tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_writer(std::io::stderr)
			.with_target(false)
			.try_init();
	}
}
