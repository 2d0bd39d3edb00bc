//! Stand-ins for hosts without the Windows shell, so composition and
//! `--dry-run` keep working there.

use crate::{
    error::ElevateError,
    launcher::{LaunchRequest, ProcessElevator},
};

#[allow(clippy::unnecessary_wraps)]
pub fn is_elevated() -> anyhow::Result<bool> {
    Ok(false)
}

#[allow(clippy::unnecessary_wraps)]
pub fn share_name_for_drive(_drive: &str) -> anyhow::Result<Option<String>> {
    Ok(None)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ShellElevator;

impl ProcessElevator for ShellElevator {
    fn launch(&self, _request: &LaunchRequest) -> anyhow::Result<()> {
        Err(ElevateError::UnsupportedPlatform.into())
    }
}
