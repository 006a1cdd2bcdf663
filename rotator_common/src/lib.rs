//! # Rotator Common
//!
//! Shared vocabulary for the antenna rotator workspace: axis identifiers,
//! fault bitflags, tunable control settings, hardware seams and the
//! wind-safety provider interface.
//!
//! Everything in this crate is free of I/O except [`config::ConfigLoader`],
//! which reads TOML files. Hardware access goes through the traits in
//! [`hal`], persistence through [`store::KeyValueStore`].

pub mod config;
pub mod consts;
pub mod fault;
pub mod hal;
pub mod prelude;
pub mod settings;
pub mod state;
pub mod store;
pub mod wind;
