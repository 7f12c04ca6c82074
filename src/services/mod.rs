pub mod database;
pub mod inserter;
pub mod loader;
pub mod s3;
pub mod store;
pub mod validation;
