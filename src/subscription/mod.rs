pub mod cache;
pub mod models;
pub mod query;
pub mod service;
pub mod tiers;
