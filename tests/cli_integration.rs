use kms_tx_signer::tx::decode_signed;
use kms_tx_signer::{Address, LocalOracle};
use serde_json::Value;
use std::io::Write;
use std::process::{Command, Output, Stdio};

const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";
const KEY_ONE_ADDRESS: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";

const CONFIG_VARS: &[&str] = &[
    "KMS_KEY_ID",
    "ETH_NETWORK",
    "ETH_CHAIN_ID",
    "ETH_LEGACY_REPLAY_PROTECTION",
    "ETH_GAS_LIMIT",
    "ETH_GAS_PRICE",
    "ETH_MAX_FEE_PER_GAS",
    "ETH_MAX_PRIORITY_FEE_PER_GAS",
    "SIGNER_CACHE_PUBLIC_KEYS",
    "SIGNER_DEV_PRIVATE_KEY",
    "LOG_LEVEL",
    "RUST_LOG",
];

fn signer() -> Command {
    let binary_path = assert_cmd::cargo::cargo_bin!("kms-tx-signer");
    let mut command = Command::new(binary_path);
    for var in CONFIG_VARS {
        command.env_remove(var);
    }
    command
}

fn configured_signer() -> Command {
    let mut command = signer();
    command
        .env("KMS_KEY_ID", "alias/cli-test")
        .env("ETH_NETWORK", "goerli")
        .env("SIGNER_DEV_PRIVATE_KEY", KEY_ONE);
    command
}

fn run_with_stdin(mut command: Command, event: &str) -> Output {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("cli spawns");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(event.as_bytes())
        .expect("event written");
    child.wait_with_output().expect("cli completes")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "cli exited unsuccessfully: {:?}",
        output
    );
    let stdout = String::from_utf8(output.stdout.clone()).expect("stdout is utf8");
    serde_json::from_str(&stdout).expect("stdout is valid json")
}

#[test]
fn cli_status_from_stdin() {
    let output = run_with_stdin(configured_signer(), r#"{"operation":"status"}"#);
    let body = stdout_json(&output);
    assert_eq!(body, serde_json::json!({ "address": KEY_ONE_ADDRESS }));
}

#[test]
fn cli_status_from_event_file() {
    let path = std::env::temp_dir().join(format!("kms-tx-signer-{}.json", std::process::id()));
    std::fs::write(&path, r#"{"operation":"status"}"#).expect("event file written");

    let output = configured_signer()
        .arg("--event")
        .arg(&path)
        .arg("--pretty")
        .output()
        .expect("cli run succeeds");
    let _ = std::fs::remove_file(&path);

    let body = stdout_json(&output);
    assert_eq!(body["address"], KEY_ONE_ADDRESS);
}

#[test]
fn cli_signs_legacy_transaction() {
    let event = r#"{
        "operation": "sign",
        "dst_address": "0x0000000000000000000000000000000000000001",
        "amount": 100,
        "nonce": 0
    }"#;
    let body = stdout_json(&run_with_stdin(configured_signer(), event));

    let raw = body["signed_tx"].as_str().expect("signed_tx is a string");
    let decoded = decode_signed(&hex::decode(&raw[2..]).expect("hex payload")).expect("decodes");
    // goerli
    assert!(decoded.v == 45 || decoded.v == 46);
    assert_eq!(
        decoded.recover_sender().expect("recovers").checksummed(),
        KEY_ONE_ADDRESS
    );
}

#[test]
fn cli_missing_parameter_is_a_response() {
    let event = r#"{"operation":"sign","amount":1,"nonce":0}"#;
    let body = stdout_json(&run_with_stdin(configured_signer(), event));
    assert_eq!(body["operation"], "sign");
    assert!(body["error"]
        .as_str()
        .expect("error is a string")
        .starts_with("missing parameter"));
}

#[test]
fn cli_unknown_operation_fails_without_body() {
    let output = run_with_stdin(configured_signer(), r#"{"operation":"unknown"}"#);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown"), "stderr: {}", stderr);
}

#[test]
fn cli_requires_configuration() {
    let output = run_with_stdin(signer(), r#"{"operation":"status"}"#);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("KMS_KEY_ID"), "stderr: {}", stderr);
}

#[test]
fn cli_generates_usable_dev_key() {
    let output = signer()
        .arg("--generate-dev-key")
        .output()
        .expect("cli run succeeds");
    let body = stdout_json(&output);

    let private_key = body["private_key"].as_str().expect("private_key is a string");
    assert_eq!(private_key.len(), 64);

    let oracle = LocalOracle::from_hex("dev", private_key).expect("generated key loads");
    let address: Address = body["address"]
        .as_str()
        .expect("address is a string")
        .parse()
        .expect("checksummed address");
    assert_eq!(oracle.address("dev"), Some(address));
}
