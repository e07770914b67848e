pub mod logging;
pub mod error;
pub mod util;

pub mod envs;
pub mod components;
pub mod agents;
pub mod configs;

pub mod cli;
pub mod engines;
