#![allow(dead_code)]

mod assert;
mod server;

pub use assert::*;
pub use server::*;
