pub mod config;
pub mod db;
pub mod locks;
pub mod mintd;
pub mod types;
