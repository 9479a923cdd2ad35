#![no_std]

// Shared logic for the start-lights controller.
//
// This crate stays portable across MCU firmware and host tooling by avoiding
// the Rust standard library and exposing abstractions the other crates can
// adopt.

pub mod controller;
pub mod lights;
pub mod output;
pub mod schedule;
pub mod sequence;
pub mod telemetry;
