// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for config module

use super::config::*;
use serial_test::serial;
use std::path::PathBuf;
use std::time::Duration;

const ENV_VARS: &[&str] = &[
    "ZONE_DIR",
    "WL_ZONE_FILE",
    "API_ADDR",
    "RELOAD_METHOD",
    "RELOAD_COMMAND",
    "RNDC_PATH",
    "WL_ZONE_NAME",
    "RELOAD_TIMEOUT_SECS",
    "ROLLBACK_ON_RELOAD_FAILURE",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.zone_dir, PathBuf::from(DEFAULT_ZONE_DIR));
    assert_eq!(config.zone_file_name, DEFAULT_WL_ZONE_FILE);
    assert_eq!(config.api_addr, DEFAULT_API_ADDR);
    assert_eq!(config.reload_method, ReloadMethod::Command);
    assert_eq!(config.zone_name, "aa-wl.rpz.ituss.cz");
    assert_eq!(config.reload_timeout, Duration::from_secs(5));
    assert!(!config.rollback_on_reload_failure);
    assert!(config.validate().is_ok());
    assert_eq!(
        config.zone_file(),
        PathBuf::from("/var/lib/bind/zones/master/aa-wl.rpz.ituss.cz.zone")
    );
}

#[test]
fn test_reload_method_parse() {
    assert_eq!("command".parse::<ReloadMethod>(), Ok(ReloadMethod::Command));
    assert_eq!(" RNDC ".parse::<ReloadMethod>(), Ok(ReloadMethod::Rndc));
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();

    let config = Config::from_env().unwrap();

    assert_eq!(config.zone_dir, PathBuf::from(DEFAULT_ZONE_DIR));
    assert_eq!(config.reload_method, ReloadMethod::Command);
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var("ZONE_DIR", "/tmp/zones");
    std::env::set_var("WL_ZONE_FILE", "wl.rpz.zone");
    std::env::set_var("API_ADDR", "0.0.0.0:9000");
    std::env::set_var("RELOAD_METHOD", "rndc");
    std::env::set_var("RNDC_PATH", "/opt/bind/sbin/rndc");
    std::env::set_var("RELOAD_TIMEOUT_SECS", "12");
    std::env::set_var("ROLLBACK_ON_RELOAD_FAILURE", "true");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.zone_file(), PathBuf::from("/tmp/zones/wl.rpz.zone"));
    assert_eq!(config.api_addr, "0.0.0.0:9000");
    assert_eq!(config.reload_method, ReloadMethod::Rndc);
    assert_eq!(config.rndc_path, "/opt/bind/sbin/rndc");
    assert_eq!(config.zone_name, "wl.rpz");
    assert_eq!(config.reload_timeout, Duration::from_secs(12));
    assert!(config.rollback_on_reload_failure);
}

#[test]
#[serial]
fn test_from_env_explicit_zone_name() {
    clear_env();
    std::env::set_var("WL_ZONE_FILE", "wl.rpz.zone");
    std::env::set_var("WL_ZONE_NAME", "rpz-whitelist");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.zone_name, "rpz-whitelist");
}

#[test]
#[serial]
fn test_from_env_unparsable_numbers_fall_back() {
    clear_env();
    std::env::set_var("RELOAD_TIMEOUT_SECS", "soon");
    std::env::set_var("ROLLBACK_ON_RELOAD_FAILURE", "maybe");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.reload_timeout, Duration::from_secs(5));
    assert!(!config.rollback_on_reload_failure);
}

#[test]
fn test_rndc_only_for_rndc_method() {
    let config = Config::default();
    assert!(config.rndc().is_none());
    assert_eq!(config.reloader().unwrap().name(), "command");

    let config = Config {
        reload_method: ReloadMethod::Rndc,
        zone_name: "wl.rpz".to_string(),
        ..Config::default()
    };
    let rndc = config.rndc().unwrap();
    assert_eq!(rndc.zone_name, "wl.rpz");
    assert_eq!(config.reloader().unwrap().name(), "rndc");
}

// Negative test cases

#[test]
fn test_reload_method_parse_invalid() {
    let err = "systemd".parse::<ReloadMethod>().unwrap_err();
    assert!(err.contains("systemd"));
}

#[test]
#[serial]
fn test_from_env_invalid_reload_method() {
    clear_env();
    std::env::set_var("RELOAD_METHOD", "signal");

    let result = Config::from_env();
    clear_env();

    assert!(result.is_err());
}

#[test]
fn test_validate_rejects_bad_values() {
    let cases = vec![
        Config {
            zone_file_name: String::new(),
            ..Config::default()
        },
        Config {
            zone_file_name: "../etc/passwd".to_string(),
            ..Config::default()
        },
        Config {
            reload_timeout: Duration::ZERO,
            ..Config::default()
        },
        Config {
            reload_command: "   ".to_string(),
            ..Config::default()
        },
        Config {
            reload_method: ReloadMethod::Rndc,
            zone_name: String::new(),
            ..Config::default()
        },
    ];

    for config in cases {
        assert!(config.validate().is_err(), "{:?} should be invalid", config);
    }
}

#[test]
fn test_reloader_empty_command() {
    let config = Config {
        reload_command: String::new(),
        ..Config::default()
    };

    assert!(config.reloader().is_err());
}
