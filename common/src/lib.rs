mod db;
mod error;
mod schema;

pub use db::*;
pub use error::*;
pub use schema::*;
