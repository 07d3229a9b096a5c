//! redrive: drains a Lambda dead-letter queue by re-invoking each failed item.
//!
//! Each queued message describes one failed asynchronous invocation. The
//! original payload is either stored inline or, for stream-triggered
//! functions, replayed from the DynamoDB change stream. The target function
//! is invoked synchronously and successful messages are deleted in batches.
//!
//! # Example
//!
//! ```ignore
//! use redrive::{Config, Redriver, aws};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("redrive.yaml")?;
//!     let services = aws::services(&config.aws, &config.queue_url).await;
//!     let mut redriver = Redriver::new(&config, services, CancellationToken::new());
//!     let stats = redriver.run().await?;
//!     println!("Redrove {} messages", stats.redriven);
//!     Ok(())
//! }
//! ```

pub mod aws;
pub mod config;
pub mod dlq;
pub mod error;
pub mod invoke;
pub mod metrics;
pub mod redrive;
pub mod signal;
pub mod stream;

// Re-export main types
pub use config::{Config, FailurePolicy, Overrides};
pub use dlq::{FailedItem, QueueMessage, QueueService};
pub use invoke::{FunctionService, InvokeOutcome};
pub use redrive::{RedriveStats, Redriver, Services};
pub use stream::{StreamReplayer, StreamService};
