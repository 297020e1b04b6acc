pub mod access;
pub mod app;
pub mod balance;
pub mod block_chain;
pub mod config;
pub mod error;
pub mod notifications;
pub mod routes;
pub mod subscription;
pub mod transactions;
pub mod wallet;
