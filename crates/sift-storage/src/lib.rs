pub mod chunks;
pub mod db;
mod error;
pub mod ledger;
pub mod models;
pub mod resumes;
pub mod schema;

pub use db::Db;
pub use error::{Error, Result};
