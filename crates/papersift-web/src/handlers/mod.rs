pub mod files;
pub mod proxy;
pub mod queries;
pub mod results;
