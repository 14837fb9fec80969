//! Configuration, logging and persistence modules.

pub mod config;
pub mod logger;
pub mod repository;
