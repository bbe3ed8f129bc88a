//! `ch57x-keyboard-tool` backed device port

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use keypilot_errors::UploadError;
use keypilot_profile::KeyMapping;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::DeviceSyncPort;
use crate::document::render_config;

/// Executable name of the external device tool.
pub const TOOL_NAME: &str = "ch57x-keyboard-tool";

const SYSTEM_TOOL_DIRS: &[&str] = &["/usr/local/bin", "/opt/homebrew/bin", "/usr/bin"];

/// Device port that shells out to `ch57x-keyboard-tool`.
#[derive(Debug, Clone)]
pub struct ToolDeviceSync {
    tool_path: PathBuf,
    scratch_dir: PathBuf,
}

impl ToolDeviceSync {
    /// Use `tool_path` if given, otherwise the first executable candidate.
    pub fn new(tool_path: Option<PathBuf>) -> Self {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        let tool_path = tool_path.unwrap_or_else(|| locate_tool(home.as_deref()));
        info!(tool = %tool_path.display(), "Using device tool");
        Self {
            tool_path,
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Port using exactly this executable.
    pub fn with_tool_path(tool_path: impl Into<PathBuf>) -> Self {
        Self {
            tool_path: tool_path.into(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Directory for the short-lived configuration documents.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn tool_path(&self) -> &Path {
        &self.tool_path
    }

    pub fn is_available(&self) -> bool {
        is_executable(&self.tool_path)
    }

    async fn run(&self, verb: &'static str, mapping: &KeyMapping) -> Result<(), UploadError> {
        if !self.is_available() {
            return Err(UploadError::ToolUnavailable(
                self.tool_path.display().to_string(),
            ));
        }

        let yaml = render_config(mapping).map_err(|e| UploadError::Io(e.to_string()))?;
        let document = ScratchDocument::create(&self.scratch_dir, &yaml).await?;

        debug!(
            tool = %self.tool_path.display(),
            verb,
            document = %document.path.display(),
            "Running device tool"
        );

        let output = Command::new(&self.tool_path)
            .arg(verb)
            .arg(&document.path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if output.status.success() {
            return Ok(());
        }

        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostic = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            stderr.into_owned()
        };
        Err(UploadError::from_tool_failure(code, &diagnostic))
    }
}

#[async_trait]
impl DeviceSyncPort for ToolDeviceSync {
    async fn upload(&self, mapping: &KeyMapping) -> Result<(), UploadError> {
        self.run("upload", mapping).await.inspect_err(|e| {
            warn!(error = %e, "Device upload failed");
        })
    }

    async fn validate(&self, mapping: &KeyMapping) -> bool {
        match self.run("validate", mapping).await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Mapping rejected by device tool");
                false
            }
        }
    }
}

/// Candidate tool locations in lookup order.
pub fn candidate_paths(home: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(SYSTEM_TOOL_DIRS.len() + 1);
    if let Some(home) = home {
        candidates.push(home.join(".cargo").join("bin").join(TOOL_NAME));
    }
    candidates.extend(SYSTEM_TOOL_DIRS.iter().map(|dir| Path::new(dir).join(TOOL_NAME)));
    candidates
}

/// First executable candidate. Falls back to the first candidate so that a
/// missing tool surfaces as `ToolUnavailable` with a useful path.
pub fn locate_tool(home: Option<&Path>) -> PathBuf {
    let candidates = candidate_paths(home);
    candidates
        .iter()
        .find(|path| is_executable(path))
        .or_else(|| candidates.first())
        .cloned()
        .unwrap_or_else(|| PathBuf::from(TOOL_NAME))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Temp document removed on drop, including when the awaiting upload is
/// cancelled by a timeout.
struct ScratchDocument {
    path: PathBuf,
}

impl ScratchDocument {
    async fn create(dir: &Path, content: &str) -> Result<Self, UploadError> {
        let path = dir.join(format!("keypilot-{}.yaml", Uuid::new_v4()));
        tokio::fs::write(&path, content).await?;
        Ok(Self { path })
    }
}

impl Drop for ScratchDocument {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "Failed to remove scratch document");
        }
    }
}
