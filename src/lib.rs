pub mod analysis_service;
pub mod api;
pub mod cache;
pub mod config;
pub mod crew;
pub mod data_structures;
pub mod error;
pub mod poller;
pub mod ticker;
