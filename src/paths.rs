use crate::error::{ClientError, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub fn stems_download_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from("dev", "StemSeparator", "stem-separator-client")
        .ok_or(ClientError::DownloadDirUnavailable)?;
    let mut p = PathBuf::from(proj.data_dir());
    p.push("stems");
    Ok(p)
}
