pub mod db;
pub mod server;
pub mod services;
pub mod version;
pub mod web;
pub mod webhook;

#[cfg(test)]
mod testing;
