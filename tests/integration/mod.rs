//! Integration tests for the Flash UI generation engine

mod config_integration;
mod generation_flow;
mod persistence_roundtrip;
mod style_properties;
mod test_utils;
