//! Metro network server.
//!
//! Manages lines, stations and suspensions, and derives each line's daily
//! trip timetable from its station list, frequency and first departure.

pub mod domain;
pub mod network;
pub mod schedule;
pub mod store;
pub mod web;
