pub mod agent;
pub mod analysis;
pub mod backup;
pub mod book;
pub mod command;
pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod ipc;
pub mod model;
pub mod oracle;
pub mod reconcile;
pub mod records;
pub mod roll;
pub mod roster;
pub mod store;
pub mod tabular;
