//! Session services.
//!
//! DESIGN
//! ======
//! `store` owns the session state; `activity`, `sync`, and `gate` are the
//! mounted components that read it or request mutations through it.
//! Each mounted component is torn down by dropping its handle.

pub mod activity;
pub mod gate;
pub mod store;
pub mod sync;
