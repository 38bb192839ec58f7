pub mod config;
pub mod logging;

// Core modules
pub mod events;
pub mod item;
pub mod progress;
pub mod queue;
pub mod scheduler;
pub mod transport;
pub mod validate;

pub use config::UploadConfig;
pub use events::UploadObservers;
pub use item::{QueueItem, UploadStatus};
pub use queue::{QueueError, UploadQueue};
pub use scheduler::{FileOutcome, RunHandle, RunSummary};
pub use validate::{AddOutcome, Candidate};
