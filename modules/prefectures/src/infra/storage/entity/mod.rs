pub mod carrier;
pub mod prefecture;
pub mod user;
