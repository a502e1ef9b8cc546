//! Language frontends.
//!
//! Api handlers and generated client modules are TypeScript; the frontend
//! reads types out of the former and erases types from the latter.

pub mod typescript;
