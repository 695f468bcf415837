pub mod ads;
pub mod health;
pub mod media;
pub mod metrics;
