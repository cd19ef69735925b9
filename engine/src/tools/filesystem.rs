//! Filesystem Core Tools
//!
//! `write_file`, `read_file` and `list_files`. Paths are resolved the same way
//! for all three:
//!
//! - absolute paths are used as-is
//! - `src/...` is relative to the process working directory (the agent's own code)
//! - anything else is relative to the workspace

use async_trait::async_trait;
use sdk::{required_arg, tool_error, CoreTool};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Maps tool path arguments onto the filesystem
#[derive(Debug, Clone)]
pub struct PathResolver {
    workspace: PathBuf,
    project_root: PathBuf,
}

impl PathResolver {
    pub fn new(workspace: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            project_root: project_root.into(),
        }
    }

    /// Resolver rooted at the current working directory
    pub fn from_cwd(workspace: impl Into<PathBuf>) -> std::io::Result<Self> {
        Ok(Self::new(workspace, std::env::current_dir()?))
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let target = Path::new(path);
        if target.is_absolute() {
            target.to_path_buf()
        } else if path.starts_with("src/") {
            self.project_root.join(target)
        } else {
            self.workspace.join(target)
        }
    }
}

pub struct WriteFileTool {
    paths: PathResolver,
}

impl WriteFileTool {
    pub fn new(paths: PathResolver) -> Self {
        Self { paths }
    }

    async fn write(&self, path: &str, content: &str) -> std::io::Result<PathBuf> {
        let target = self.paths.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        info!("Writing {} bytes to: {}", content.len(), target.display());
        fs::write(&target, content).await?;
        Ok(target)
    }
}

#[async_trait]
impl CoreTool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn signature(&self) -> &str {
        "write_file(path, content)"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating parent directories as needed."
    }

    async fn call(&self, args: &[String]) -> String {
        let (path, content) = match (
            required_arg(self.name(), args, 0),
            required_arg(self.name(), args, 1),
        ) {
            (Ok(path), Ok(content)) => (path, content),
            (Err(e), _) | (_, Err(e)) => return e,
        };

        match self.write(path, content).await {
            Ok(target) => format!("File written to {}", target.display()),
            Err(e) => tool_error(format_args!("Failed to write file: {}", e)),
        }
    }
}

pub struct ReadFileTool {
    paths: PathResolver,
}

impl ReadFileTool {
    pub fn new(paths: PathResolver) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl CoreTool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn signature(&self) -> &str {
        "read_file(path)"
    }

    fn description(&self) -> &str {
        "Read a UTF-8 text file."
    }

    async fn call(&self, args: &[String]) -> String {
        let path = match required_arg(self.name(), args, 0) {
            Ok(path) => path,
            Err(e) => return e,
        };

        let target = self.paths.resolve(path);
        match fs::read_to_string(&target).await {
            Ok(content) => {
                debug!("Read {} bytes from {}", content.len(), target.display());
                content
            }
            Err(e) => tool_error(format_args!("Failed to read file: {}", e)),
        }
    }
}

pub struct ListFilesTool {
    paths: PathResolver,
}

impl ListFilesTool {
    pub fn new(paths: PathResolver) -> Self {
        Self { paths }
    }

    async fn list(&self, dir: &str) -> std::io::Result<Vec<String>> {
        let target = self.paths.resolve(dir);
        let mut entries = fs::read_dir(&target).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl CoreTool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn signature(&self) -> &str {
        "list_files(dir = \".\")"
    }

    fn description(&self) -> &str {
        "List the entries of a directory, one per line."
    }

    async fn call(&self, args: &[String]) -> String {
        let dir = args.first().map(String::as_str).unwrap_or(".");

        match self.list(dir).await {
            Ok(names) => names.join("\n"),
            Err(e) => tool_error(format_args!("Failed to list files: {}", e)),
        }
    }
}
