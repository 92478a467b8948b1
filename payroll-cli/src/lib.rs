pub mod app;
pub mod logging;
pub mod render;
pub mod utils;

pub use app::{Cli, Command, build_registry, execute};
