//! Integration test modules

mod config;
mod loading;
mod navigation;
mod playback;
