pub mod session;
pub mod vision;
