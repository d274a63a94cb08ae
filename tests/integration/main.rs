//! Host-side integration tests for the control engine and protocol layer.

mod mock_hw;

mod override_tests;
mod protocol_tests;
