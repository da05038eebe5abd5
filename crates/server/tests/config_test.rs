//! # Configuration Tests
//!
//! `PORT` is process-global, so these tests run serially.

use flightscan_server::config::{get_config, DEFAULT_PORT};
use serial_test::serial;
use std::env;

#[test]
#[serial]
fn test_port_defaults_to_9090() {
    env::remove_var("PORT");
    let config = get_config().expect("Configuration should load without PORT");
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.port, 9090);
}

#[test]
#[serial]
fn test_port_from_environment() {
    env::set_var("PORT", "9999");
    let config = get_config().expect("Configuration should load with PORT set");
    assert_eq!(config.port, 9999);
    env::remove_var("PORT");
}

#[test]
#[serial]
fn test_invalid_port_is_an_error() {
    env::set_var("PORT", "not-a-port");
    assert!(get_config().is_err());
    env::remove_var("PORT");
}
