use std::sync::Arc;

pub mod actor;
pub mod config;
pub mod maintenance;
pub mod membership;
pub mod node;
pub mod rescale;
pub mod swarm;

pub type AppConfig = Arc<config::Config>;
