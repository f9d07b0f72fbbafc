pub mod config;
pub mod features;
pub mod fetch;
pub mod model;
pub mod output;
pub mod parser;
pub mod render;
pub mod reports;
pub mod reshape;
