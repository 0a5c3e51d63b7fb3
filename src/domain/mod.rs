mod email_subscription;
mod subscriber_email;

pub use email_subscription::EmailSubscription;
pub use subscriber_email::{EmailValidationError, SubscriberEmail};
