//! Pomodesk - Pomodoro interval timer and to-do list served over HTTP
//!
//! This library provides the timer engine, the task list and the JSON API
//! that exposes both.

pub mod api;
pub mod config;
pub mod logging;
pub mod tasks;
pub mod timer;
