pub mod camera;
pub mod config;
pub mod pose;
pub mod protocol;
pub mod render;
pub mod rep;
