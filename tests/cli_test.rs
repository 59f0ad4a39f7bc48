// Tests for the command line surface that need no browser
use anyhow::Result;
use serde_json::Value;
use std::process::Command;
use tempfile::TempDir;

/// Helper to run the testability binary with an empty home directory
fn run_command(args: &[&str]) -> Result<(Value, i32)> {
    let home = TempDir::new()?;
    let output = Command::new(env!("CARGO_BIN_EXE_testability"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("RUST_LOG")
        .output()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let exit_code = output.status.code().unwrap_or(-1);
    let json = serde_json::from_str(&stdout)?;
    Ok((json, exit_code))
}

#[test]
fn test_invalid_batch_is_a_configuration_error() -> Result<()> {
    let (result, exit_code) = run_command(&["run", "not json"])?;

    assert_eq!(exit_code, 7);
    assert_eq!(result["error"].as_bool(), Some(true));
    assert_eq!(result["exit_code"].as_i64(), Some(7));
    assert!(result["message"].as_str().unwrap().contains("Invalid batch commands"));
    Ok(())
}

#[test]
fn test_unreachable_webdriver() -> Result<()> {
    let (result, exit_code) = run_command(&[
        "run",
        r#"[{"keyword": "Get Location"}]"#,
        "--webdriver",
        "http://127.0.0.1:9",
    ])?;

    assert_eq!(exit_code, 4);
    assert_eq!(result["exit_code"].as_i64(), Some(4));
    assert!(result["message"].as_str().unwrap().contains("geckodriver"));
    Ok(())
}

#[test]
fn test_invalid_flag_values() -> Result<()> {
    let (_, exit_code) = run_command(&["check", "https://example.com", "--timeout", "soonish"])?;
    assert_eq!(exit_code, 7);

    let (_, exit_code) = run_command(&["check", "https://example.com", "--browser", "lynx"])?;
    assert_eq!(exit_code, 7);
    Ok(())
}

#[test]
fn test_bad_config_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"timeout": []}"#)?;

    let (result, exit_code) = run_command(&[
        "--config",
        path.to_str().unwrap(),
        "run",
        "[]",
    ])?;
    assert_eq!(exit_code, 7);
    assert_eq!(result["error"].as_bool(), Some(true));
    Ok(())
}
