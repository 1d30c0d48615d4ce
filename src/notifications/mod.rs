//! User notifications: data model, repository trait and the publishing engine.

mod engine;
mod models;
mod store;

pub use engine::{NotificationEngine, NotifyError};
pub use models::{CandidateNotification, Notification, NotificationType};
pub use store::{FullStore, NotificationStore};
