mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod postgres;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod config;
mod constants;
pub mod handlers;
pub mod media;
pub mod routes;
pub mod state;

pub use authentication::*;
pub use constants::*;
pub use database::*;
pub use routes::routes;
