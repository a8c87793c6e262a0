// Library for tests to access modules

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod live;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod version;
