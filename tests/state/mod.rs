//! State management integration tests
//!
//! Tests for calibration persistence, serialization, storage operations
//! and recovery from damaged files.

pub mod serialization_test;
