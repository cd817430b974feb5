use std::path::PathBuf;

use windlass::secrets::{read_key_from, write_key_to};

fn tmp_dir(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_nanos();
    let path = std::env::temp_dir().join(format!("windlass-secrets-{label}-{nanos}"));
    std::fs::create_dir_all(&path).expect("create temp dir");
    path
}

#[test]
fn writes_and_reads_provider_key() {
    let dir = tmp_dir("roundtrip");
    let path = write_key_to(&dir, "anthropic", "sk-ant-test").expect("write key");
    assert!(path.exists());
    let loaded = read_key_from(&dir, "anthropic");
    assert_eq!(loaded.as_deref(), Some("sk-ant-test"));
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn key_is_trimmed_on_write_and_read() {
    let dir = tmp_dir("trim");
    write_key_to(&dir, "openai", "  sk-padded  \n").expect("write key");
    assert_eq!(read_key_from(&dir, "openai").as_deref(), Some("sk-padded"));
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn empty_key_is_rejected() {
    let dir = tmp_dir("empty");
    let err = write_key_to(&dir, "anthropic", "   ").expect_err("should fail");
    assert!(err.to_string().contains("cannot be empty"));
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn rejects_unknown_provider() {
    let dir = tmp_dir("unknown");
    let err = write_key_to(&dir, "bad/../../provider", "x").expect_err("should fail");
    assert!(err.to_string().contains("unsupported provider"));
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn missing_key_reads_as_none() {
    let dir = tmp_dir("missing");
    assert!(read_key_from(&dir, "anthropic").is_none());
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn provider_name_is_normalized() {
    let dir = tmp_dir("normalize");
    write_key_to(&dir, "  Anthropic ", "sk-case").expect("write key");
    assert_eq!(read_key_from(&dir, "anthropic").as_deref(), Some("sk-case"));
    std::fs::remove_dir_all(dir).ok();
}

#[cfg(unix)]
#[test]
fn credential_file_has_0600_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tmp_dir("perms-file");
    let path = write_key_to(&dir, "anthropic", "sk-test").expect("write key");

    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(
        mode, 0o600,
        "credential file should be mode 0600, got {mode:04o}"
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[cfg(unix)]
#[test]
fn credentials_dir_has_0700_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tmp_dir("perms-dir");
    write_key_to(&dir, "anthropic", "sk-test").expect("write key");

    let cred_dir = dir.join("credentials");
    let mode = std::fs::metadata(&cred_dir).unwrap().permissions().mode() & 0o777;
    assert_eq!(
        mode, 0o700,
        "credentials dir should be mode 0700, got {mode:04o}"
    );

    std::fs::remove_dir_all(&dir).ok();
}
