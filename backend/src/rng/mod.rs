//! Deterministic random number generation
//!
//! Routing decisions (probability-weighted choice, tie-breaks between equal
//! predictions) draw from a seeded xorshift64* generator so an experiment is
//! reproducible from its seed.

mod xorshift;

pub use xorshift::RngManager;
