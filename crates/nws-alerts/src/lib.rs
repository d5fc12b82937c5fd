pub mod alerter;
pub mod cli;
pub mod collector;
pub mod config;
pub mod identity;
pub mod models;
pub mod reconciler;
pub mod service;
pub mod storage;
pub mod whitelist;
