pub mod client_repo;
pub mod plant_repo;
pub mod product_repo;
pub mod supplier_repo;
pub mod user_repo;

pub use client_repo::ClientRepo;
pub use plant_repo::PlantRepo;
pub use product_repo::ProductRepo;
pub use supplier_repo::SupplierRepo;
pub use user_repo::UserRepo;
