pub mod error;
pub mod notification;

pub use error::AppError;
pub use notification::{Notification, NotificationKind};
