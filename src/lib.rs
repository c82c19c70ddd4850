//! gmon-profile library.

#![deny(warnings)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod gmon;
pub mod profile;
pub mod reader;
pub mod resolver;
pub mod symbols;

pub mod filebuf;

#[cfg(test)]
mod tests;
