//! Read entities definitions.

pub mod appointment;
pub mod shop;
pub mod treatment;
pub mod user;
