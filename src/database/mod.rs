//! Database module exports.

mod models;
mod mongo;
mod repository;

pub use models::*;
pub use mongo::Database;
pub use repository::{AuthCodeRepo, BanRepo, BotRepo, RankRepo, UserRepo};
