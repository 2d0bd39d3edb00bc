use crate::{error::ElevateError, platform};
use std::{fs, io, path::Path};

/// Filesystem queries needed to rewrite a path for a session that lacks the
/// caller's drive mappings.
pub trait PathResolver {
    /// Absolute form of an existing file's path.
    ///
    /// # Errors
    ///
    /// Fails when `path` does not name an accessible file.
    fn resolve_absolute(&self, path: &str) -> anyhow::Result<String>;

    /// Remote name (`\\server\share`) behind a drive prefix such as `D:`, or
    /// `None` when the drive is local.
    ///
    /// # Errors
    ///
    /// Fails when the OS lookup itself fails.
    fn share_name(&self, drive: &str) -> anyhow::Result<Option<String>>;
}

/// Resolver backed by the real filesystem and, on Windows, the WNet API.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsPathResolver;

impl PathResolver for FsPathResolver {
    fn resolve_absolute(&self, path: &str) -> anyhow::Result<String> {
        let to_error = |source: io::Error| ElevateError::PathResolution {
            path: path.to_owned(),
            source,
        };

        let metadata = fs::metadata(path).map_err(to_error)?;
        if !metadata.is_file() {
            let kind = if metadata.is_dir() {
                io::ErrorKind::IsADirectory
            } else {
                io::ErrorKind::InvalidInput
            };
            return Err(to_error(kind.into()).into());
        }
        let absolute = std::path::absolute(Path::new(path)).map_err(to_error)?;

        absolute
            .into_os_string()
            .into_string()
            .map_err(|raw| ElevateError::NonUnicodePath(raw.into()).into())
    }

    fn share_name(&self, drive: &str) -> anyhow::Result<Option<String>> {
        platform::share_name_for_drive(drive)
    }
}

/// Rewrites `path` into its UNC form when it lives on a mapped network drive.
///
/// Paths that are not drive-letter paths (for instance ones that are already
/// UNC) and paths on local drives come back in their resolved absolute form.
///
/// # Errors
///
/// Propagates resolution and share lookup failures from `resolver`.
pub fn normalize_network_path(resolver: &dyn PathResolver, path: &str) -> anyhow::Result<String> {
    let resolved = resolver.resolve_absolute(path)?;

    let Some(split) = drive_prefix_len(&resolved) else {
        return Ok(resolved);
    };
    let (drive, rest) = resolved.split_at(split);

    match resolver.share_name(drive)? {
        Some(share) => {
            tracing::debug!(drive, share = %share, "drive is mapped to a network share");
            Ok(format!("{share}{rest}"))
        }
        None => Ok(resolved),
    }
}

/// Byte length of the `X:` prefix when the second character is a drive separator.
fn drive_prefix_len(path: &str) -> Option<usize> {
    match path.char_indices().nth(1) {
        Some((index, ':')) => Some(index + 1),
        _ => None,
    }
}
