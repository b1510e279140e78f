#![forbid(unsafe_code)]

mod protocol;
mod server;

pub mod handler;
