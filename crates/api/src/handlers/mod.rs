pub mod import;
pub mod upload;
pub mod users;
