pub mod bid;
pub mod context;
pub mod events;
pub mod health;
pub mod weave;
