pub mod client;
pub mod command;
pub mod config;
pub mod discord;
pub mod handler;
