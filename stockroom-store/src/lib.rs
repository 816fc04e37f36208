pub mod app_config;
pub mod database;
pub mod inventory_repo;

pub use database::DbClient;
pub use inventory_repo::SqliteInventoryRepository;
