//! Result assembly: locating artifacts and packaging the deliverable.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{AssemblyError, Error, Result};
use crate::types::{ARCHIVE_FILE_NAME, JobId, ResultLocation};

/// Find the newest file with extension `ext` in `dir` that is not already recorded
pub(super) async fn find_new_artifact(
    dir: &Path,
    ext: &str,
    recorded: &[PathBuf],
) -> Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches_ext = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(ext));
        if !matches_ext || recorded.contains(&path) {
            continue;
        }

        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if newest.as_ref().is_none_or(|(at, _)| modified > *at) {
            newest = Some((modified, path));
        }
    }

    Ok(newest.map(|(_, path)| path))
}

/// Package the artifacts into the job's result directory
///
/// One artifact is moved as-is. Several are bundled into [`ARCHIVE_FILE_NAME`] inside
/// the staging directory first, and the archive is moved.
pub(super) async fn assemble(
    id: JobId,
    artifacts: &[PathBuf],
    staging_dir: &Path,
    result_dir: &Path,
) -> Result<ResultLocation> {
    let deliverable = match artifacts {
        [] => return Err(AssemblyError::NoFilesDownloaded.into()),
        [single] => single.clone(),
        many => {
            let archive_path = staging_dir.join(ARCHIVE_FILE_NAME);
            write_archive(many.to_vec(), archive_path.clone()).await?;
            archive_path
        }
    };

    let file_name = deliverable
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Other(format!("artifact has no file name: {}", deliverable.display())))?;

    tokio::fs::create_dir_all(result_dir).await?;
    let target = result_dir.join(&file_name);
    move_file(&deliverable, &target).await?;

    tracing::debug!(
        job_id = %id,
        file = %file_name,
        artifacts = artifacts.len(),
        "Deliverable ready"
    );

    Ok(ResultLocation::new(id, file_name))
}

/// Write a stored (uncompressed) zip of `files`, each under its own file name
async fn write_archive(files: Vec<PathBuf>, archive_path: PathBuf) -> Result<()> {
    let path_for_error = archive_path.clone();
    tokio::task::spawn_blocking(move || write_archive_blocking(&files, &archive_path))
        .await
        .map_err(|e| AssemblyError::Archive {
            path: path_for_error,
            reason: format!("archive task failed: {e}"),
        })?
}

fn write_archive_blocking(files: &[PathBuf], archive_path: &Path) -> Result<()> {
    let archive_error = |reason: String| AssemblyError::Archive {
        path: archive_path.to_path_buf(),
        reason,
    };

    let out = File::create(archive_path).map_err(|e| archive_error(e.to_string()))?;
    let mut writer = zip::ZipWriter::new(BufWriter::new(out));

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| archive_error(format!("no file name: {}", path.display())))?;

        let input = File::open(path).map_err(|e| archive_error(e.to_string()))?;
        let size = input
            .metadata()
            .map_err(|e| archive_error(e.to_string()))?
            .len();

        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .large_file(size > u64::from(u32::MAX));
        writer
            .start_file(name, options)
            .map_err(|e| archive_error(e.to_string()))?;
        std::io::copy(&mut BufReader::new(input), &mut writer)
            .map_err(|e| archive_error(e.to_string()))?;
    }

    writer.finish().map_err(|e| archive_error(e.to_string()))?;
    Ok(())
}

/// Move a file, falling back to copy and delete across filesystems
async fn move_file(source: &Path, dest: &Path) -> Result<()> {
    let move_error = |e: std::io::Error| AssemblyError::MoveFailed {
        source_path: source.to_path_buf(),
        dest_path: dest.to_path_buf(),
        reason: e.to_string(),
    };

    if tokio::fs::rename(source, dest).await.is_ok() {
        return Ok(());
    }

    tokio::fs::copy(source, dest).await.map_err(move_error)?;
    tokio::fs::remove_file(source).await.map_err(move_error)?;
    Ok(())
}
