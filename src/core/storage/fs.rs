use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::{LauncherError, LauncherResult};

/// Read and parse a JSON document.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> LauncherResult<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Serialize `value` as pretty JSON and replace `path` atomically.
///
/// The document is written to a sibling temp file first and renamed over the
/// target, so readers observe either the old or the new content.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> LauncherResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes()).await
}

pub async fn write_atomic(path: &Path, bytes: &[u8]) -> LauncherResult<()> {
    ensure_parent(path).await?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

    tokio::fs::write(&temp, bytes)
        .await
        .map_err(|e| LauncherError::io(&temp, e))?;

    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(LauncherError::io(path, e));
    }
    Ok(())
}

/// Create every missing directory above `path`.
pub async fn ensure_parent(path: &Path) -> LauncherResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }
    Ok(())
}

pub async fn create_dir_safe(path: &Path) -> LauncherResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Copy a single file, creating the destination's directories. Errors name
/// the source when it cannot be read and the destination otherwise.
pub async fn copy_file(source: &Path, destination: &Path) -> LauncherResult<()> {
    ensure_parent(destination).await?;
    if let Err(e) = tokio::fs::copy(source, destination).await {
        let readable = tokio::fs::metadata(source).await.is_ok_and(|meta| meta.is_file());
        return Err(LauncherError::io(if readable { destination } else { source }, e));
    }
    Ok(())
}

/// Move a file, falling back to copy + delete across filesystems.
pub async fn move_file(source: &Path, destination: &Path) -> LauncherResult<()> {
    ensure_parent(destination).await?;
    match tokio::fs::rename(source, destination).await {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound && !source.exists() => {
            return Err(LauncherError::io(source, e));
        }
        Err(e) => debug!("Rename {:?} -> {:?} failed, copying instead: {}", source, destination, e),
    }
    copy_file(source, destination).await?;
    tokio::fs::remove_file(source)
        .await
        .map_err(|e| LauncherError::io(source, e))
}

/// Delete `target` (recursively when it is a directory), then remove parent
/// directories that became empty, walking upward and stopping at the first
/// non-empty directory or at `root`.
pub async fn delete_and_clean(root: &Path, target: &Path) -> LauncherResult<()> {
    match tokio::fs::metadata(target).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(target)
            .await
            .map_err(|e| LauncherError::io(target, e))?,
        Ok(_) => tokio::fs::remove_file(target)
            .await
            .map_err(|e| LauncherError::io(target, e))?,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(LauncherError::io(target, e)),
    }

    remove_empty_parents(root, target).await
}

async fn remove_empty_parents(root: &Path, target: &Path) -> LauncherResult<()> {
    let mut current: Option<PathBuf> = target.parent().map(Path::to_path_buf);

    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        if !is_empty_dir(&dir).await? {
            break;
        }
        tokio::fs::remove_dir(&dir)
            .await
            .map_err(|e| LauncherError::io(&dir, e))?;
        debug!("Removed empty directory {:?}", dir);
        current = dir.parent().map(Path::to_path_buf);
    }
    Ok(())
}

async fn is_empty_dir(dir: &Path) -> LauncherResult<bool> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(LauncherError::io(dir, e)),
    };
    let first = entries
        .next_entry()
        .await
        .map_err(|e| LauncherError::io(dir, e))?;
    Ok(first.is_none())
}

/// Replace every character that is unsafe in a directory name with `_`.
pub fn create_valid_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || "_-.()[]{}".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("yamcl-fs-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn delete_and_clean_removes_empty_parents_up_to_non_empty_dir() {
        let root = scratch("clean");
        let keep = root.join("lib").join("org").join("keep.txt");
        let target = root.join("lib").join("org").join("lwjgl").join("2.9.1");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("lwjgl-2.9.1.jar"), b"jar").unwrap();
        std::fs::write(&keep, b"x").unwrap();

        delete_and_clean(&root, &target).await.unwrap();

        assert!(!root.join("lib").join("org").join("lwjgl").exists());
        assert!(keep.exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn delete_and_clean_never_removes_root() {
        let root = scratch("root");
        let target = root.join("only").join("file.bin");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, b"x").unwrap();

        delete_and_clean(&root, &target).await.unwrap();

        assert!(!root.join("only").exists());
        assert!(root.exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn write_json_atomic_leaves_no_temp_files() {
        let root = scratch("atomic");
        let path = root.join("nested").join("index.json");

        write_json_atomic(&path, &serde_json::json!({"a": 1})).await.unwrap();
        write_json_atomic(&path, &serde_json::json!({"a": 2})).await.unwrap();

        let value: serde_json::Value = read_json(&path).await.unwrap();
        assert_eq!(value["a"], 2);
        let leftovers = std::fs::read_dir(root.join("nested")).unwrap().count();
        assert_eq!(leftovers, 1);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn copy_errors_name_the_failing_side() {
        let root = scratch("copy-errors");
        let source = root.join("a.jar");
        std::fs::write(&source, b"jar").unwrap();
        let blocked = root.join("out").join("a.jar");
        std::fs::create_dir_all(&blocked).unwrap();

        match copy_file(&source, &blocked).await.unwrap_err() {
            LauncherError::Io { path, .. } => assert_eq!(path, blocked),
            other => panic!("unexpected error: {other}"),
        }
        let missing = root.join("missing.jar");
        match move_file(&missing, &root.join("b.jar")).await.unwrap_err() {
            LauncherError::Io { path, source } => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn valid_name_replaces_unsafe_characters() {
        assert_eq!(create_valid_name("My World: 1.7/10"), "My_World__1.7_10");
        assert_eq!(create_valid_name("Old_1.5.2"), "Old_1.5.2");
    }
}
