pub mod agent;
pub mod analysis;
pub mod attendance;
pub mod backup_exchange;
pub mod classes;
pub mod core;
pub mod files;
pub mod profile;
pub mod students;
