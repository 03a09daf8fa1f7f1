//! Common test utilities for hydrogrid.
//!
//! This module provides fixture writers and float assertions shared by the
//! integration tests.

#![allow(dead_code)]

pub mod assertions;
pub mod test_data;
