//! # Songboard Common Library
//!
//! Shared code for the songboard service:
//! - Domain model (songs, users, roles)
//! - Database initialization and schema
//! - Configuration loading
//! - Credential helpers (password hashing, bearer tokens)
//! - View-count formatting

pub mod auth;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod seed;
pub mod song;
pub mod time;
pub mod user;
pub mod views;

pub use error::{Error, Result};
pub use song::{NewSong, Song, SongChanges, SongStatus, VideoFields};
pub use user::{NewUser, Role, User, UserRecord};
