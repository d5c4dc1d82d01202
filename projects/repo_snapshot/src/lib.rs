pub mod app;
pub mod config;
pub mod db;
pub mod endpoints;
pub mod utils;
