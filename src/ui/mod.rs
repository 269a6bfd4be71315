//! Full-screen terminal interface

pub mod app;
pub mod conversation;
pub mod pages;

pub use app::run;
