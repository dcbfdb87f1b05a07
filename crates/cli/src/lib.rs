//! Quiesce command-line front end

pub mod cmd;
pub mod logging;
pub mod render;
pub mod system_config;
