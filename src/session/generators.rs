use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Trait for generating session ids
pub trait SessionIdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random UUID v4 session ids
pub struct UuidSessionIdGenerator;

impl UuidSessionIdGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UuidSessionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIdGenerator for UuidSessionIdGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Source of the current time for minting and validation
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
