pub mod app;
pub mod auth;
pub mod error;
pub mod geo;
pub mod routes;
pub mod state;
pub mod storage;
