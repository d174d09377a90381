//! Unit tests for configuration module

use defi_bridge_client::config::DEFAULT_CONFIG_PATH;
use defi_bridge_client::{BridgeClientConfig, BridgeError};
use ethereum_types::U256;

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{build_test_config, DUMMY_PROXY_ADDR, DUMMY_SENDER_ADDR};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn minimal_toml() -> String {
    format!(
        r#"
[chain]
name = "mainnet-fork"
rpc_url = "http://127.0.0.1:8545"
chain_id = 1

[proxy]
address = "{}"
sender = "{}"
"#,
        DUMMY_PROXY_ADDR, DUMMY_SENDER_ADDR
    )
}

fn assert_config_error(config: &BridgeClientConfig, needle: &str) {
    match config.validate() {
        Err(BridgeError::Config(message)) => assert!(
            message.contains(needle),
            "error '{}' should mention '{}'",
            message,
            needle
        ),
        other => panic!("expected Config error mentioning '{}', got {:?}", needle, other),
    }
}

// ============================================================================
// PARSING TESTS
// ============================================================================

/// What is tested: Minimal TOML fills in transaction defaults and the default event
/// Why: Most deployments only need the chain and proxy sections
#[test]
fn test_from_toml_defaults() {
    let config = BridgeClientConfig::from_toml(&minimal_toml()).unwrap();
    assert_eq!(config.chain.chain_id, 1);
    assert_eq!(config.transaction.receipt_poll_interval_ms, 500);
    assert_eq!(config.transaction.receipt_timeout_ms, 120_000);
    assert_eq!(config.transaction.gas_limit, None);
    assert!(config.proxy.completion_event.starts_with("AztecBridgeInteraction("));
    assert_eq!(config.transaction.send_options().unwrap(), Default::default());
}

/// What is tested: Gas settings parse into send options
#[test]
fn test_from_toml_gas_settings() {
    let toml = format!(
        "{}\n[transaction]\ngas_limit = 2000000\ngas_price = \"100000000000\"\n",
        minimal_toml()
    );
    let config = BridgeClientConfig::from_toml(&toml).unwrap();
    let options = config.transaction.send_options().unwrap();
    assert_eq!(options.gas_limit, Some(2_000_000));
    assert_eq!(options.gas_price, Some(U256::from(100_000_000_000u64)));
}

/// What is tested: Malformed TOML and missing sections are Config errors
#[test]
fn test_from_toml_rejects_malformed() {
    assert!(matches!(
        BridgeClientConfig::from_toml("[chain"),
        Err(BridgeError::Config(_))
    ));
    assert!(matches!(
        BridgeClientConfig::from_toml("[chain]\nname = \"x\"\nrpc_url = \"http://x\"\nchain_id = 1\n"),
        Err(BridgeError::Config(_))
    ));
}

/// What is tested: The shipped template is a valid configuration
/// Why: Operators start from it; it must not drift from the config structs
#[test]
fn test_template_parses() {
    let path = format!(
        "{}/config/bridge_client.template.toml",
        env!("CARGO_MANIFEST_DIR")
    );
    let config = BridgeClientConfig::load_from_path(Some(&path)).unwrap();
    assert_eq!(config.chain.name, "mainnet-fork");
    assert_eq!(config.transaction.receipt_poll_interval_ms, 500);
}

// ============================================================================
// VALIDATION TESTS
// ============================================================================

/// What is tested: BridgeClientConfig::validate() accepts a valid configuration
#[test]
fn test_config_validation_success() {
    assert!(build_test_config("http://127.0.0.1:8545").validate().is_ok());
}

/// What is tested: validate() rejects bad addresses and an empty RPC URL
#[test]
fn test_config_validation_rejects_bad_endpoints() {
    let mut config = build_test_config("http://127.0.0.1:8545");
    config.proxy.address = "0xnot-an-address".to_string();
    assert_config_error(&config, "proxy.address");

    let mut config = build_test_config("http://127.0.0.1:8545");
    config.proxy.sender = "0x1234".to_string();
    assert_config_error(&config, "proxy.sender");

    let config = build_test_config("  ");
    assert_config_error(&config, "rpc_url");
}

/// What is tested: validate() rejects a zero poll interval and a timeout shorter than it
/// Why: Either would make receipt waiting spin or give up before the first poll
#[test]
fn test_config_validation_rejects_bad_polling() {
    let mut config = build_test_config("http://127.0.0.1:8545");
    config.transaction.receipt_poll_interval_ms = 0;
    assert_config_error(&config, "receipt_poll_interval_ms");

    let mut config = build_test_config("http://127.0.0.1:8545");
    config.transaction.receipt_poll_interval_ms = 1_000;
    config.transaction.receipt_timeout_ms = 500;
    assert_config_error(&config, "receipt_timeout_ms");
}

/// What is tested: validate() rejects a non-decimal gas price
#[test]
fn test_config_validation_rejects_bad_gas_price() {
    let mut config = build_test_config("http://127.0.0.1:8545");
    config.transaction.gas_price = Some("0x10".to_string());
    assert_config_error(&config, "gas_price");
}

/// What is tested: validate() requires the completion event to carry the result fields
/// Why: Results are read by name; a custom event missing one can never be decoded
#[test]
fn test_config_validation_rejects_incomplete_event() {
    let mut config = build_test_config("http://127.0.0.1:8545");
    config.proxy.completion_event =
        "Done(address indexed bridgeAddress,uint256 outputValueA,uint256 outputValueB)".to_string();
    assert_config_error(&config, "isAsync");

    let mut config = build_test_config("http://127.0.0.1:8545");
    config.proxy.completion_event =
        "Done(bool outputValueA,uint256 outputValueB,bool isAsync)".to_string();
    assert_config_error(&config, "outputValueA");

    let mut config = build_test_config("http://127.0.0.1:8545");
    config.proxy.completion_event = "not an event".to_string();
    assert_config_error(&config, "completion_event");
}

/// What is tested: A custom event with the required fields in another order is accepted
#[test]
fn test_config_validation_accepts_custom_event() {
    let mut config = build_test_config("http://127.0.0.1:8545");
    config.proxy.completion_event =
        "BridgeDone(bool isAsync,uint128 outputValueB,uint256 outputValueA)".to_string();
    assert!(config.validate().is_ok());
}

// ============================================================================
// FILE LOADING TESTS
// ============================================================================

/// What is tested: A missing file is reported as a Config error naming the path
#[test]
fn test_load_from_path_missing_file() {
    let err = BridgeClientConfig::load_from_path(Some("/nonexistent/bridge_client.toml")).unwrap_err();
    match err {
        BridgeError::Config(message) => assert!(message.contains("/nonexistent/bridge_client.toml")),
        other => panic!("expected Config error, got {:?}", other),
    }
    assert_eq!(DEFAULT_CONFIG_PATH, "config/bridge_client.toml");
}

/// What is tested: load_from_path() reads and validates a file on disk
#[test]
fn test_load_from_path_reads_file() {
    let path = std::env::temp_dir().join(format!("bridge_client_test_{}.toml", std::process::id()));
    std::fs::write(&path, minimal_toml()).unwrap();

    let result = BridgeClientConfig::load_from_path(path.to_str());
    std::fs::remove_file(&path).unwrap();

    let config = result.unwrap();
    assert_eq!(config.proxy.address, DUMMY_PROXY_ADDR);
    assert_eq!(config.proxy.sender, DUMMY_SENDER_ADDR);
}
