pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod facets;
pub mod http_server;
pub mod markdown;
pub mod models;
pub mod ranking;
pub mod scanner;
pub mod service;

pub use error::{Error, Result};
