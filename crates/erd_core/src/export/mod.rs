use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::aggregate::MonthKey;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityLogFile {
    pub path: String,
    pub filename: String,
    pub bytes: u64,
    pub sha256: String,
}

/// `ActivityLog_October_2025.txt`
pub fn activity_log_filename(month: MonthKey) -> String {
    format!("ActivityLog_{}_{}.txt", month.calendar_month(), month.year)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Write the log text as UTF-8 into `dir` under its deterministic month filename.
///
/// The file is written to a temp name first and renamed into place, so a reader never sees
/// a partial log. An existing file for the same month is replaced.
pub fn write_activity_log(dir: &Path, month: MonthKey, text: &str) -> Result<ActivityLogFile, AppError> {
    fs::create_dir_all(dir).map_err(|e| {
        AppError::new("EXPORT_DIR_FAILED", "Failed to create export directory")
            .with_details(format!("path={}; err={}", dir.display(), e))
    })?;

    let filename = activity_log_filename(month);
    let final_path = dir.join(&filename);
    let tmp_path = dir.join(format!(".{filename}.tmp"));

    fs::write(&tmp_path, text.as_bytes()).map_err(|e| {
        AppError::new("EXPORT_WRITE_FAILED", "Failed to write activity log")
            .with_details(format!("path={}; err={}", tmp_path.display(), e))
    })?;
    fs::rename(&tmp_path, &final_path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        AppError::new("EXPORT_WRITE_FAILED", "Failed to move activity log into place")
            .with_details(format!("path={}; err={}", final_path.display(), e))
    })?;

    let out = ActivityLogFile {
        path: final_path.to_string_lossy().to_string(),
        filename,
        bytes: text.len() as u64,
        sha256: sha256_hex(text.as_bytes()),
    };
    tracing::info!(path = %out.path, bytes = out.bytes, "activity log written");
    Ok(out)
}
