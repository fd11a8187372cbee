#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::{Config, ModelArgs};
pub use runner::{Health, Runner};
pub use server::{app, start};

pub mod config;
mod errors;
mod helpers;
mod routes;
pub mod runner;
mod server;
mod shutdown;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
	tracing_subscriber::registry()
		.with(tracing_subscriber::fmt::layer())
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			"cropdoc=info,cropdoc_server=info,cropdoc_core=info,tower_http=info".into()
		}))
		.init();
}
