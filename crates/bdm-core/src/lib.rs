pub mod config;
pub mod logging;

pub mod checksum;
pub mod downloader;
pub mod fs_ops;
pub mod model;
pub mod paths;
pub mod resolver;
pub mod unarchiver;
