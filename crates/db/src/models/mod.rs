pub mod client;
pub mod plant;
pub mod product;
pub mod supplier;
pub mod user;
