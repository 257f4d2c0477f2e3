pub mod response;
pub mod routes;
pub mod service;
