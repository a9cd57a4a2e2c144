pub mod batch;
pub mod cache;
pub mod classifier;
pub mod dates;
pub mod engine;
pub mod mapper;
pub mod platform;
pub mod projects;
pub mod registry;
