//! Python bindings
//!
//! Exposes the instance manager to Python policy drivers. Instance ids cross
//! the boundary as plain integers; ids the manager never issued raise
//! `IndexError` instead of aborting the interpreter.

pub mod manager;
