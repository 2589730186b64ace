//! Loopdeck Core - Media loop scheduling engine
//!
//! This crate provides the core functionality for looping a media folder
//! on a kiosk display: configuration, playlist building, the playback
//! backend contract, and the background scheduler.

pub mod backend;
pub mod config;
pub mod library;
pub mod scheduler;

pub use backend::{ BackendError, PlaybackBackend, ProcessBackend, ProcessBackendOptions };
pub use config::{ ConfigError, PlayerConfig };
pub use library::{ build_playlist, MediaKind };
pub use scheduler::{ RunState, Scheduler, SchedulerError, SchedulerTiming };
