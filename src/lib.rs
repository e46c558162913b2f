pub mod controller;
pub mod shared;

pub use controller::build_router;
pub use shared::structs::client::{Client, ClientBuilder};
