pub mod activity_log;
pub mod aggregate;
pub mod classify;
pub mod config;
pub mod db;
pub mod demo;
pub mod domain;
pub mod error;
pub mod export;
pub mod logging;
pub mod normalize;
pub mod repo;
pub mod timeline;
pub mod validate;
