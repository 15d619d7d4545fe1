//! # UI Module
//!
//! This module contains all UI components for the Humminger application.

pub mod main_display;
pub mod spectrum;
