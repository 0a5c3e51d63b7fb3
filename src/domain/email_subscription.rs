use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::subscriber_email::SubscriberEmail;

/// A single waitlist entry. Never updated once stored.
#[derive(Debug, Clone)]
pub struct EmailSubscription {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub created_at: DateTime<Utc>,
}

impl EmailSubscription {
    pub fn new(email: SubscriberEmail) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            created_at: Utc::now(),
        }
    }
}
