use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::SubscriberEmail;

/// `subscribers`表中的一条订阅记录
#[derive(Debug)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn new(email: SubscriberEmail, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            created_at: now,
            updated_at: now,
        }
    }
}
