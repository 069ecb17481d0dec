use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;

use crate::download::{StagedAsset, staging_dir_prefix};
use crate::error::UpdateError;
use crate::script::{ReplacePlan, render_script, script_file_name};
use crate::ui::UpdateProgress;

/// Proof that the deferred replacement script is running.
///
/// From this point on the install cannot fail back to the caller; the only
/// remaining step is [`exit_for_update`].
#[derive(Debug)]
pub struct LaunchedInstall {
    script_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetKind {
    Executable,
    Archive,
}

fn asset_kind(path: &Path) -> Result<AssetKind, UpdateError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("exe") => Ok(AssetKind::Executable),
        Some("zip") => Ok(AssetKind::Archive),
        _ => Err(UpdateError::UnsupportedAsset {
            file_name: path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned()),
        }),
    }
}

/// Stage the downloaded asset for installation and launch the deferred
/// replacement script.
///
/// The asset kind is decided first and checksum verification runs before any
/// extraction, so unsupported or corrupt downloads fail before anything is
/// written near the install path. On success the script is already running
/// detached; the caller's only remaining move is [`exit_for_update`].
///
/// # Errors
/// Returns an error for unsupported asset formats, checksum mismatches,
/// extraction failures, and failures to write or launch the script. None of
/// these terminate the process.
pub async fn prepare_install(
    asset: &StagedAsset,
    expected_sha256: Option<&str>,
    target_exe: &Path,
    progress: &mpsc::Sender<UpdateProgress>,
) -> Result<LaunchedInstall, UpdateError> {
    let kind = asset_kind(&asset.path)?;

    if let Some(expected) = expected_sha256 {
        verify_checksum(&asset.path, expected)?;
    }

    let plan = match kind {
        AssetKind::Executable => ReplacePlan::ReplaceExe {
            source: asset.path.clone(),
            target: target_exe.to_path_buf(),
        },
        AssetKind::Archive => {
            let _ = progress.send(UpdateProgress::Extracting).await;
            let extract_dir = asset.staging_dir.join("extracted");
            std::fs::create_dir_all(&extract_dir)
                .map_err(|error| UpdateError::io("failed to create extraction directory", error))?;
            extract_zip(&asset.path, &extract_dir)?;
            let target_dir = target_exe.parent().ok_or_else(|| UpdateError::InstallLocation {
                details: "install target has no parent directory".to_string(),
            })?;
            ReplacePlan::OverlayDir {
                source_dir: extract_dir,
                target_dir: target_dir.to_path_buf(),
                relaunch: target_exe.to_path_buf(),
            }
        }
    };

    let _ = progress.send(UpdateProgress::Applying).await;

    let script_path = asset.staging_dir.join(script_file_name());
    std::fs::write(&script_path, render_script(&plan)).map_err(|source| {
        UpdateError::InstallScript {
            context: "write failed",
            source,
        }
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755));
    }

    launch_detached(&script_path).map_err(|source| UpdateError::InstallScript {
        context: "launch failed",
        source,
    })?;

    info!("install script launched: {}", script_path.display());
    Ok(LaunchedInstall { script_path })
}

/// Terminate the process so the launched script can replace its files.
///
/// Does not return. Past [`prepare_install`] there is no way to report
/// failure to the caller; termination is the contract.
pub fn exit_for_update(launched: &LaunchedInstall) -> ! {
    info!(
        "exiting to release file handles for {}",
        launched.script_path.display()
    );
    std::process::exit(0)
}

#[cfg(windows)]
fn launch_detached(script_path: &Path) -> std::io::Result<()> {
    use std::os::windows::process::CommandExt;
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

    Command::new("cmd")
        .arg("/C")
        .arg(script_path)
        .creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}

#[cfg(not(windows))]
fn launch_detached(script_path: &Path) -> std::io::Result<()> {
    Command::new("sh")
        .arg(script_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}

fn verify_checksum(path: &Path, expected: &str) -> Result<(), UpdateError> {
    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        debug!("checksum verified for {}", path.display());
        return Ok(());
    }
    Err(UpdateError::ChecksumMismatch {
        file_name: path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned()),
        expected: expected.to_ascii_lowercase(),
        actual,
    })
}

fn sha256_file(path: &Path) -> Result<String, UpdateError> {
    let mut file = std::fs::File::open(path).map_err(|error| {
        UpdateError::io_with_path("failed to open file for checksum", path, &error)
    })?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];

    loop {
        let read = file.read(&mut buffer).map_err(|error| {
            UpdateError::io_with_path("failed to read file for checksum", path, &error)
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

fn extract_zip(zip_path: &Path, dest: &Path) -> Result<(), UpdateError> {
    let file = std::fs::File::open(zip_path)
        .map_err(|error| UpdateError::io_with_path("failed to open zip file", zip_path, &error))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|error| UpdateError::zip("failed to read zip archive", error))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|error| UpdateError::zip("failed to read zip entry", error))?;
        let Some(name) = entry.enclosed_name() else {
            warn!("Skipping zip entry with unsafe path");
            continue;
        };
        let out_path = dest.join(name);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|error| {
                UpdateError::io_with_path("failed to create extraction directory", &out_path, &error)
            })?;
        } else {
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent).map_err(|error| {
                    UpdateError::io_with_path(
                        "failed to create extraction parent directory",
                        parent,
                        &error,
                    )
                })?;
            }
            let mut outfile = std::fs::File::create(&out_path).map_err(|error| {
                UpdateError::io_with_path("failed to create extracted file", &out_path, &error)
            })?;
            std::io::copy(&mut entry, &mut outfile).map_err(|error| {
                UpdateError::io_with_path("failed to extract archive entry", &out_path, &error)
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    let _ =
                        std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
                }
            }
        }
    }

    debug!("Extraction complete to {}", dest.display());
    Ok(())
}

/// Remove staging directories left behind by earlier update attempts.
///
/// The deferred script deletes itself but not its staging directory; host
/// applications call this on startup.
pub fn cleanup_stale_staging(app_name: &str) {
    let prefix = staging_dir_prefix(app_name);
    let Ok(entries) = std::fs::read_dir(std::env::temp_dir()) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() && entry.file_name().to_string_lossy().starts_with(&prefix) {
            debug!("Cleaning up stale update staging dir: {}", path.display());
            let _ = std::fs::remove_dir_all(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::path::Path;

    use tokio::sync::mpsc;

    use super::{AssetKind, asset_kind, extract_zip, prepare_install, sha256_file, verify_checksum};
    use crate::download::StagedAsset;
    use crate::error::UpdateError;
    use crate::script::script_file_name;
    use crate::ui::UpdateProgress;

    #[test]
    fn asset_kind_recognizes_exe_and_zip() {
        assert_eq!(
            asset_kind(Path::new("MyApp-Setup.exe")).unwrap(),
            AssetKind::Executable
        );
        assert_eq!(asset_kind(Path::new("MyApp.ZIP")).unwrap(), AssetKind::Archive);
    }

    #[test]
    fn asset_kind_rejects_everything_else() {
        let result = asset_kind(Path::new("notes.txt"));
        assert!(matches!(
            result,
            Err(UpdateError::UnsupportedAsset { ref file_name }) if file_name == "notes.txt"
        ));
        assert!(asset_kind(Path::new("no-extension")).is_err());
    }

    #[tokio::test]
    async fn unsupported_asset_fails_before_writing_a_script() {
        let staging = tempfile::tempdir().expect("tempdir should be created");
        let asset_path = staging.path().join("notes.txt");
        std::fs::write(&asset_path, b"not an update").expect("asset file should be written");
        let asset = StagedAsset {
            path: asset_path,
            staging_dir: staging.path().to_path_buf(),
        };
        let (tx, _rx) = mpsc::channel(8);

        let result =
            prepare_install(&asset, None, Path::new("/opt/myapp/MyApp"), &tx).await;

        assert!(matches!(result, Err(UpdateError::UnsupportedAsset { .. })));
        assert!(
            !staging.path().join(script_file_name()).exists(),
            "no deferred script may exist after a fail-fast rejection"
        );
    }

    #[tokio::test]
    async fn checksum_mismatch_fails_before_extraction() {
        let staging = tempfile::tempdir().expect("tempdir should be created");
        let asset_path = staging.path().join("MyApp.zip");
        std::fs::write(&asset_path, b"zip bytes").expect("asset file should be written");
        let asset = StagedAsset {
            path: asset_path,
            staging_dir: staging.path().to_path_buf(),
        };
        let (tx, _rx) = mpsc::channel(8);

        let wrong = "0".repeat(64);
        let result =
            prepare_install(&asset, Some(&wrong), Path::new("/opt/myapp/MyApp"), &tx).await;

        assert!(matches!(result, Err(UpdateError::ChecksumMismatch { .. })));
        assert!(!staging.path().join("extracted").exists());
        assert!(!staging.path().join(script_file_name()).exists());
    }

    #[test]
    fn sha256_file_returns_known_digest() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let file_path = temp.path().join("payload.bin");
        std::fs::write(&file_path, b"skiff").expect("payload file should be written");

        let digest = sha256_file(&file_path).expect("checksum should be computed");
        assert_eq!(
            digest,
            "7985a8b8e1885ff73de4ece8dd8e8ed5280d2cd1422deb1f30f0c6aa1f4e70fc"
        );
    }

    #[test]
    fn verify_checksum_is_case_insensitive() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let file_path = temp.path().join("payload.bin");
        std::fs::write(&file_path, b"skiff").expect("payload file should be written");

        let expected = "7985A8B8E1885FF73DE4ECE8DD8E8ED5280D2CD1422DEB1F30F0C6AA1F4E70FC";
        assert!(verify_checksum(&file_path, expected).is_ok());
    }

    #[test]
    fn extract_zip_expands_files_and_directories() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let zip_path = temp.path().join("update.zip");
        let extract_dir = temp.path().join("extract");

        let zip_file = std::fs::File::create(&zip_path).expect("zip file should be created");
        let mut writer = zip::ZipWriter::new(zip_file);
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
        writer
            .add_directory("nested/", options)
            .expect("directory entry should be written");
        writer
            .start_file("nested/skiff", options)
            .expect("file entry should be started");
        writer
            .write_all(b"binary-content")
            .expect("file entry should be written");
        writer.finish().expect("zip archive should be finalized");

        extract_zip(&zip_path, &extract_dir).expect("zip should extract");

        let extracted = std::fs::read(extract_dir.join("nested/skiff"))
            .expect("extracted file should exist and be readable");
        assert_eq!(extracted, b"binary-content");
    }

    #[test]
    fn extract_zip_skips_unsafe_paths() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let zip_path = temp.path().join("unsafe.zip");
        let extract_dir = temp.path().join("extract");

        let zip_file = std::fs::File::create(&zip_path).expect("zip file should be created");
        let mut writer = zip::ZipWriter::new(zip_file);
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
        writer
            .start_file("../outside.txt", options)
            .expect("unsafe file entry should be started");
        writer
            .write_all(b"should not be extracted")
            .expect("unsafe file entry should be written");
        writer.finish().expect("zip archive should be finalized");

        extract_zip(&zip_path, &extract_dir).expect("zip extraction should not fail");

        assert!(
            !temp.path().join("outside.txt").exists(),
            "unsafe path should not be extracted outside destination"
        );
    }

    #[test]
    fn cleanup_removes_only_matching_staging_dirs() {
        let temp = std::env::temp_dir();
        let stale = temp.join("CleanupTestApp_update_0000");
        let unrelated = temp.join("CleanupTestApp_data");
        std::fs::create_dir_all(&stale).expect("stale dir should be created");
        std::fs::create_dir_all(&unrelated).expect("unrelated dir should be created");

        super::cleanup_stale_staging("CleanupTestApp");

        assert!(!stale.exists());
        assert!(unrelated.exists());
        let _ = std::fs::remove_dir_all(&unrelated);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn launched_script_replaces_the_target_and_removes_itself() {
        let staging = tempfile::tempdir().expect("staging dir should be created");
        let install = tempfile::tempdir().expect("install dir should be created");

        let asset_path = staging.path().join("MyApp.exe");
        std::fs::write(&asset_path, b"new-version").expect("asset should be written");
        let target = install.path().join("MyApp.exe");
        std::fs::write(&target, b"old-version").expect("target should be written");

        let asset = StagedAsset {
            path: asset_path,
            staging_dir: staging.path().to_path_buf(),
        };
        let (tx, mut rx) = mpsc::channel(8);

        let launched = prepare_install(&asset, None, &target, &tx)
            .await
            .expect("script should launch");
        drop(launched);

        assert_eq!(rx.recv().await, Some(UpdateProgress::Applying));

        let script_path = staging.path().join(script_file_name());
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(15);
        loop {
            let replaced =
                std::fs::read(&target).is_ok_and(|content| content == b"new-version");
            if replaced && !script_path.exists() {
                break;
            }
            assert!(
                std::time::Instant::now() < deadline,
                "deferred script did not replace the target in time"
            );
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        }
    }
}
