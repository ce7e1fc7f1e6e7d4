//! Shared building blocks for the gateway workspace.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, header inspection, iat checks)
pub mod jwt;

/// Module for secret types that prevent accidental logging
pub mod secret;
