pub mod handler;
pub mod mirror;
pub mod model;
pub mod service;
