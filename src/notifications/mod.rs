pub mod notifier;
pub mod scheduler;
pub mod service;

pub use notifier::ConsoleNotifier;
pub use scheduler::{NotificationScheduler, SyncOutcome};
pub use service::NotificationService;
