use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

#[derive(Debug, Error)]
pub enum FileError {
    #[error("file path is required")]
    MissingPath,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        let path = path.display().to_string();
        if source.kind() == ErrorKind::NotFound {
            FileError::NotFound(path)
        } else {
            FileError::Io { path, source }
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub is_directory: bool,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub children: Option<Vec<FileEntry>>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Image,
    Text,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileContent {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileWritten {
    pub path: String,
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileRead {
    pub path: String,
    pub content: String,
}

/// Browse and edit files on the host running the server
#[derive(Debug, Clone)]
pub struct FileService {
    excluded: Vec<String>,
}

impl FileService {
    pub fn new(excluded: Vec<String>) -> Self {
        Self { excluded }
    }

    /// Entries under `directory` (cwd when absent). A missing directory yields no entries.
    pub async fn list(&self, directory: Option<&str>, recursive: bool) -> Result<Vec<FileEntry>, FileError> {
        let root = match directory.filter(|d| !d.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().map_err(|e| FileError::io(Path::new("."), e))?,
        };
        let excluded = self.excluded.clone();

        tokio::task::spawn_blocking(move || tree(&root, recursive, &excluded))
            .await
            .map_err(|e| FileError::Io {
                path: "<list>".to_string(),
                source: std::io::Error::new(ErrorKind::Other, e),
            })?
    }

    pub async fn content(&self, file_path: Option<&str>) -> Result<FileContent, FileError> {
        let file_path = required(file_path)?;
        let path = Path::new(file_path);

        if is_image(path) {
            let bytes = tokio::fs::read(path).await.map_err(|e| FileError::io(path, e))?;
            return Ok(FileContent {
                content: STANDARD.encode(bytes),
                kind: ContentKind::Image,
            });
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FileError::io(path, e))?;
        Ok(FileContent {
            content,
            kind: ContentKind::Text,
        })
    }

    /// Create the file and any missing parents. Content is written only when given.
    pub async fn create(&self, file_path: Option<&str>, content: Option<&str>) -> Result<FileWritten, FileError> {
        let path = resolve(required(file_path)?)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FileError::io(parent, e))?;
        }

        match content {
            Some(content) if !content.is_empty() => {
                tokio::fs::write(&path, content)
                    .await
                    .map_err(|e| FileError::io(&path, e))?;
            }
            _ => {
                tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .await
                    .map_err(|e| FileError::io(&path, e))?;
            }
        }

        info!("Wrote {}", path.display());
        Ok(FileWritten {
            path: path.display().to_string(),
            message: "File created/updated successfully",
        })
    }

    pub async fn read(&self, file_path: Option<&str>) -> Result<FileRead, FileError> {
        let path = resolve(required(file_path)?)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| FileError::io(&path, e))?;
        Ok(FileRead {
            path: path.display().to_string(),
            content,
        })
    }

    /// Remove a file or a whole directory tree
    pub async fn delete(&self, file_path: Option<&str>) -> Result<FileWritten, FileError> {
        let path = resolve(required(file_path)?)?;
        let metadata = tokio::fs::symlink_metadata(&path)
            .await
            .map_err(|e| FileError::io(&path, e))?;

        if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        }
        .map_err(|e| FileError::io(&path, e))?;

        info!("Deleted {}", path.display());
        Ok(FileWritten {
            path: path.display().to_string(),
            message: "File/Folder deleted successfully",
        })
    }
}

fn required(path: Option<&str>) -> Result<&str, FileError> {
    path.map(str::trim).filter(|p| !p.is_empty()).ok_or(FileError::MissingPath)
}

fn resolve(path: &str) -> Result<PathBuf, FileError> {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().map_err(|e| FileError::io(Path::new("."), e))?;
    Ok(cwd.join(path))
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn tree(dir: &Path, recursive: bool, excluded: &[String]) -> Result<Vec<FileEntry>, FileError> {
    let reader = match std::fs::read_dir(dir) {
        Ok(reader) => reader,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Listing missing directory {}", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(FileError::io(dir, e)),
    };

    let mut entries = Vec::new();
    for entry in reader {
        let entry = entry.map_err(|e| FileError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if excluded.iter().any(|x| *x == name) {
            continue;
        }

        let path = entry.path();
        let is_directory = std::fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false);
        let children = if is_directory && recursive {
            Some(tree(&path, true, excluded)?)
        } else {
            None
        };

        entries.push(FileEntry {
            name,
            is_directory,
            path: path.display().to_string(),
            kind: if is_directory { "folder" } else { "file" },
            children,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
