use std::{
	error::Error,
	fmt::{self, Display},
	future::Future,
	sync::atomic::{AtomicBool, Ordering},
};
use tokio::{signal, sync::watch};

#[derive(Debug, PartialEq, Eq)]
pub struct AlreadyCreatedError;

impl Error for AlreadyCreatedError {}

impl Display for AlreadyCreatedError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("shutdown handler already created")
	}
}

static CREATED: AtomicBool = AtomicBool::new(false);

/// Resolves every [`Shutdown::handle`] once SIGINT or SIGTERM arrives, or [`Shutdown::start`] is called.
#[derive(Debug, Clone)]
pub struct Shutdown {
	sender: watch::Sender<bool>,
	receiver: watch::Receiver<bool>,
}

impl Shutdown {
	/// Create the process-wide shutdown handler and listen for termination signals.
	///
	/// # Errors
	///
	/// Returns [`AlreadyCreatedError`] if called more than once.
	pub fn new() -> Result<Self, AlreadyCreatedError> {
		if CREATED.swap(true, Ordering::SeqCst) {
			return Err(AlreadyCreatedError);
		}

		let shutdown = Self::detached();

		let signalled = shutdown.clone();
		tokio::spawn(async move {
			register_handlers().await;
			signalled.start();
		});

		Ok(shutdown)
	}

	/// A handler that only fires when [`Shutdown::start`] is called.
	pub fn detached() -> Self {
		let (sender, receiver) = watch::channel(false);

		Self { sender, receiver }
	}

	pub fn start(&self) {
		if !self.sender.send_replace(true) {
			tracing::info!("Shutdown requested");
		}
	}

	pub fn handle(&self) -> impl Future<Output = ()> + Send + 'static {
		let mut receiver = self.receiver.clone();

		async move {
			loop {
				let started = *receiver.borrow_and_update();
				if started || receiver.changed().await.is_err() {
					return;
				}
			}
		}
	}
}

async fn register_handlers() {
	let ctrl_c = async {
		if let Err(error) = signal::ctrl_c().await {
			tracing::error!("Failed to install Ctrl+C handler: {error}");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			},
			Err(error) => {
				tracing::error!("Failed to install SIGTERM handler: {error}");
				std::future::pending::<()>().await;
			},
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	tracing::info!("Received shutdown signal");
}
