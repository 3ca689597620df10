// ─── Native Extraction ───
// Unpacks a natives jar into its classifier directory.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// Extract every entry of the zip at `jar` into `dest`, skipping entries
/// whose archive path starts with one of `exclude`. Entries that would
/// escape `dest` are skipped as well. Returns the number of files written.
pub async fn extract_natives(jar: &Path, dest: &Path, exclude: &[String]) -> LauncherResult<usize> {
    let jar = jar.to_path_buf();
    let dest = dest.to_path_buf();
    let exclude = exclude.to_vec();

    tokio::task::spawn_blocking(move || extract_blocking(&jar, &dest, &exclude))
        .await
        .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))?
}

fn extract_blocking(jar: &Path, dest: &Path, exclude: &[String]) -> LauncherResult<usize> {
    let file = std::fs::File::open(jar).map_err(|e| LauncherError::io(jar, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    std::fs::create_dir_all(dest).map_err(|e| LauncherError::io(dest, e))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        if exclude.iter().any(|prefix| name.starts_with(prefix.as_str())) {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            debug!("Skipping unsafe archive entry {}", name);
            continue;
        };
        let target: PathBuf = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| LauncherError::io(&target, e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out = std::fs::File::create(&target).map_err(|e| LauncherError::io(&target, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&target, e))?;
        written += 1;
    }

    debug!("Extracted {} native files from {:?}", written, jar);
    Ok(written)
}


#[cfg(test)]
mod tests {
    use super::testing::jar_with;
    use super::*;

    #[tokio::test]
    async fn extracts_everything_but_excluded_prefixes() {
        let dir = std::env::temp_dir().join(format!("yamcl-natives-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let jar = dir.join("lwjgl-platform-2.9.1-natives-linux.jar");
        std::fs::write(
            &jar,
            jar_with(&[
                ("liblwjgl64.so", "elf"),
                ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0"),
                ("sub/libopenal.so", "elf2"),
            ]),
        )
        .unwrap();

        let dest = dir.join("natives-linux");
        let count = extract_natives(&jar, &dest, &["META-INF/".to_string()])
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(std::fs::read(dest.join("liblwjgl64.so")).unwrap(), b"elf");
        assert!(dest.join("sub").join("libopenal.so").exists());
        assert!(!dest.join("META-INF").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
