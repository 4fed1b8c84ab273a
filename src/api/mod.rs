pub mod detector;
pub mod models;
pub mod session;
