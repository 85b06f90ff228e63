use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

fn workspace() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("w3social-auth-cli-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run(config: &Path, args: &[&str]) -> Output {
    let binary_path = env!("CARGO_BIN_EXE_w3social-auth");
    Command::new(binary_path)
        .arg("--config")
        .arg(config)
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("Failed to start w3social-auth binary")
}

fn assert_success(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "Process exited with non-zero status: {}\nStdout: {}\nStderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn init(dir: &Path) -> PathBuf {
    let config = dir.join("w3social-auth.yaml");
    let data_dir = dir.join("data");
    let output = run(
        &config,
        &["init", "--data-dir", data_dir.to_str().expect("utf-8 path")],
    );
    assert!(output.status.success(), "init failed: {output:?}");
    config
}

#[test]
fn cli_login_verify_and_profile() {
    let dir = workspace();
    let config = init(&dir);

    let session = assert_success(&run(&config, &["login", "--private-key", DEV_KEY]));
    assert_eq!(session["created"], true);
    assert_eq!(session["identity"]["walletAddress"], DEV_ADDRESS);
    let token = session["token"].as_str().expect("token string").to_string();

    let claims = assert_success(&run(&config, &["verify", "--token", &token]));
    assert_eq!(claims["address"], DEV_ADDRESS);
    assert_eq!(claims["role"], "USER");

    let updated = assert_success(&run(
        &config,
        &["update-profile", "--token", &token, "--username", "alice"],
    ));
    assert_eq!(updated["username"], "alice");

    // A second process sees the persisted identity
    let profile = assert_success(&run(&config, &["profile", "--address", DEV_ADDRESS]));
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["id"], session["identity"]["id"]);

    let again = assert_success(&run(&config, &["login", "--private-key", DEV_KEY]));
    assert_eq!(again["created"], false);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn cli_rejects_malformed_signature() {
    let dir = workspace();
    let config = init(&dir);

    let challenge = assert_success(&run(&config, &["challenge", "--address", DEV_ADDRESS]));
    let message = challenge["message"].as_str().expect("message string");
    assert!(message.contains(challenge["nonce"].as_str().expect("nonce string")));

    let short_signature = format!("0x{}", "ab".repeat(64));
    let output = run(
        &config,
        &[
            "authenticate",
            "--address",
            DEV_ADDRESS,
            "--message",
            message,
            "--signature",
            &short_signature,
        ],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid_signature"));

    let profile = run(&config, &["profile", "--address", DEV_ADDRESS]);
    assert!(!profile.status.success());
    assert!(String::from_utf8_lossy(&profile.stderr).contains("not_found"));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn cli_init_refuses_to_overwrite() {
    let dir = workspace();
    let config = init(&dir);

    let output = run(&config, &["init"]);
    assert!(!output.status.success());

    let forced = run(&config, &["init", "--force"]);
    assert!(forced.status.success());

    let _ = std::fs::remove_dir_all(dir);
}
