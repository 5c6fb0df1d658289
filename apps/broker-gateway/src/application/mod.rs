//! Application layer - ports and services.

/// Interfaces to external systems.
pub mod ports;

/// Caller-facing services and the reconciliation scheduler.
pub mod services;
