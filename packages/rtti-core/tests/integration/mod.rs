//! Integration tests for the reflection runtime.
//!
//! 1. Round trips through the binary stream
//! 2. Schema evolution between builds
//! 3. Cyclic graph detection
//! 4. Asset persistence
//! 5. Text format and scripting bridge

pub mod asset_tests;
pub mod compatibility_tests;
pub mod cycle_tests;
pub mod helpers;
pub mod round_trip_tests;
pub mod text_and_interop_tests;
