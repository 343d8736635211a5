mod auth;
mod crypt;
mod error;
mod routes;
mod store;
mod token;

pub use auth::*;
pub use crypt::*;
pub use error::*;
pub use routes::*;
pub use store::*;
pub use token::*;
