//! Core of the `tunein` radio player: stations and their now-playing
//! metadata decoders, the external player driver, and configuration.

pub mod config;
pub mod platform;
pub mod player;
pub mod song;
pub mod station;
