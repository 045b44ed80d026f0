mod database {
    pub mod actions;
    pub mod dto;
    pub mod error;
    pub mod pagination;
    pub mod schema;
    pub mod shopping_list;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

mod server {
    pub mod handlers;
    pub mod routes;
}

pub use authentication::*;
pub use constants::*;
pub use database::*;
pub use server::*;
