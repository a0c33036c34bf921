pub mod balance;
pub mod draft;
pub mod friend;
pub mod group;
pub mod settlement;
pub mod transaction;
pub mod user;
