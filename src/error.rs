use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElevateError {
    #[error("missing executable path (usage: elevate <executable> [args...])")]
    MissingExecutable,

    #[error("cannot resolve `{path}`")]
    PathResolution {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("resolved path is not valid Unicode: {}", .0.display())]
    NonUnicodePath(PathBuf),

    #[cfg_attr(not(windows), allow(dead_code))]
    #[error("network share lookup for drive {drive} failed (error={code})")]
    ShareLookup { drive: String, code: u32 },

    #[cfg_attr(not(windows), allow(dead_code))]
    /// `ShellExecuteW` reports failures as values of 32 or less.
    #[error("failed to launch `{executable}` (error={code})")]
    Launch { executable: String, code: usize },

    #[cfg_attr(windows, allow(dead_code))]
    #[error("elevated launch is only supported on Windows")]
    UnsupportedPlatform,
}
