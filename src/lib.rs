// #![warn(missing_docs)]

#[macro_use]
extern crate log;

pub mod actions;
pub mod bar;
pub mod bindings;
pub mod client;
pub mod config;
pub mod draw;
pub mod error;
pub mod events;
pub mod geometry;
pub mod helpers;
pub mod layout;
pub mod menu;
pub mod modules;
pub mod monitor;
pub mod registry;
pub mod rules;
pub mod spawn;
pub mod status;
pub mod swallow;
pub mod tag;
pub mod wm;
pub mod xconnection;

#[cfg(test)]
mod mock;

pub type Result<T> = anyhow::Result<T>;

pub use config::Config;
pub use wm::{Services, WindowManager};
pub use xconnection::XcbConnection;
