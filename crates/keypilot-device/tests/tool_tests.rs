//! Tool port tests against scripted stand-ins for `ch57x-keyboard-tool`
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use keypilot_device::{DeviceConfig, DeviceSyncPort, ToolDeviceSync};
use keypilot_errors::UploadError;
use keypilot_profile::KeyMapping;
use tempfile::TempDir;

fn must<T, E: std::fmt::Debug>(r: std::result::Result<T, E>) -> T {
    match r {
        Ok(v) => v,
        Err(e) => panic!("unexpected Err: {e:?}"),
    }
}

/// Install a shell script named like the real tool and return its path.
fn fake_tool(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("ch57x-keyboard-tool");
    must(fs::write(&path, format!("#!/bin/sh\n{body}\n")));
    must(fs::set_permissions(&path, fs::Permissions::from_mode(0o755)));
    path
}

fn port_with(body: &str) -> (ToolDeviceSync, TempDir, TempDir) {
    let tool_dir = must(TempDir::new());
    let scratch = must(TempDir::new());
    let tool = fake_tool(tool_dir.path(), body);
    let port = ToolDeviceSync::with_tool_path(tool).with_scratch_dir(scratch.path());
    (port, tool_dir, scratch)
}

fn writer_mapping() -> KeyMapping {
    KeyMapping::new(["cmd-b", "cmd-i", "cmd-u"], "volumedown", "mute", "volumeup")
}

#[tokio::test]
async fn upload_passes_rendered_document_to_tool() {
    let capture_dir = must(TempDir::new());
    let capture = capture_dir.path().join("captured.yaml");
    let (port, _tool, _scratch) = port_with(&format!(
        "[ \"$1\" = upload ] || exit 9\ncat \"$2\" > '{}'",
        capture.display()
    ));

    must(port.upload(&writer_mapping()).await);

    let captured = must(fs::read_to_string(&capture));
    let config: DeviceConfig = must(serde_yaml::from_str(&captured));
    assert_eq!(config.to_mapping(), Some(writer_mapping()));
}

#[tokio::test]
async fn scratch_document_is_removed_after_run() {
    let (port, _tool, scratch) = port_with("exit 0");

    must(port.upload(&writer_mapping()).await);

    assert_eq!(must(fs::read_dir(scratch.path())).count(), 0);
}

#[tokio::test]
async fn usb_diagnostic_means_device_not_connected() {
    let (port, _tool, _scratch) = port_with("echo 'Error: USB device not found' >&2\nexit 1");

    let result = port.upload(&writer_mapping()).await;
    assert_eq!(result, Err(UploadError::DeviceNotConnected));
}

#[tokio::test]
async fn other_failures_keep_code_and_message() {
    let (port, _tool, _scratch) = port_with("echo 'unknown key: hyper' >&2\nexit 3");

    let result = port.upload(&writer_mapping()).await;
    assert_eq!(
        result,
        Err(UploadError::ProcessFailure {
            code: 3,
            message: "unknown key: hyper".to_string(),
        })
    );
}

#[tokio::test]
async fn validate_reports_exit_status_only() {
    let (accepting, _t1, _s1) = port_with("[ \"$1\" = validate ] && exit 0\nexit 1");
    let (rejecting, _t2, _s2) = port_with("exit 1");

    assert!(accepting.validate(&writer_mapping()).await);
    assert!(!rejecting.validate(&writer_mapping()).await);
}

#[tokio::test]
async fn non_executable_tool_is_unavailable() {
    let dir = must(TempDir::new());
    let path = dir.path().join("ch57x-keyboard-tool");
    must(fs::write(&path, "#!/bin/sh\nexit 0\n"));
    must(fs::set_permissions(&path, fs::Permissions::from_mode(0o644)));

    let port = ToolDeviceSync::with_tool_path(&path);
    assert!(!port.is_available());
    assert!(matches!(
        port.upload(&writer_mapping()).await,
        Err(UploadError::ToolUnavailable(_))
    ));
}
