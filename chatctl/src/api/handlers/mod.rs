pub mod files;
pub mod models;
