// Library for tests to access modules

pub mod config;
pub mod history_repo;
pub mod live_buffer;
pub mod models;
pub mod routes;
pub mod series;
pub mod session;
pub mod version;
pub mod worker;
