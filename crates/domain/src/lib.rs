//! # fitrecord-domain
//!
//! Pure domain model for the fitrecord telemetry subsystem.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Samples** (named numeric metrics) and **telemetry frames**
//! - Describe **GATT** services/characteristics, the well-known fitness
//!   UUIDs, service/characteristic filters and connection states
//! - Decode characteristic payloads into samples (bit-exact, no IO)
//! - Define **sensor configuration** and **location fixes**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod decoder;
pub mod gatt;
pub mod location;
pub mod sample;
pub mod sensor;
