use crate::{
    error::ElevateError,
    launcher::{LaunchRequest, ProcessElevator},
};
use std::{ffi::OsStr, os::windows::ffi::OsStrExt};
use windows::{
    Win32::{
        Foundation::{
            ERROR_BAD_DEVICE,
            ERROR_CONNECTION_UNAVAIL,
            ERROR_MORE_DATA,
            ERROR_NO_NETWORK,
            ERROR_NOT_CONNECTED,
            HANDLE,
            MAX_PATH,
            NO_ERROR,
            WIN32_ERROR,
        },
        NetworkManagement::WNet::WNetGetConnectionW,
        Security::{GetTokenInformation, TOKEN_ELEVATION, TOKEN_QUERY, TokenElevation},
        System::Threading::{GetCurrentProcess, OpenProcessToken},
        UI::{Shell::ShellExecuteW, WindowsAndMessaging::SW_SHOWNORMAL},
    },
    core::{Free, PCWSTR, PWSTR},
};

pub struct WindowsGuard<T: Free>(pub T);

impl<T: Free> Drop for WindowsGuard<T> {
    fn drop(&mut self) {
        unsafe { self.0.free() };
    }
}

fn to_wide(value: &str) -> Vec<u16> {
    OsStr::new(value).encode_wide().chain(Some(0)).collect()
}

pub fn is_elevated() -> anyhow::Result<bool> {
    let mut token = WindowsGuard(HANDLE::default());
    unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &raw mut token.0) }
        .inspect_err(|err| {
            tracing::debug!("Failed to open current process token (error={err})");
        })?;

    let mut elevation = TOKEN_ELEVATION::default();
    let mut len = u32::try_from(size_of::<TOKEN_ELEVATION>())?;
    unsafe {
        GetTokenInformation(
            token.0,
            TokenElevation,
            Some((&raw mut elevation).cast()),
            len,
            &raw mut len,
        )
    }
    .inspect_err(|err| tracing::debug!("Failed to get token elevation (error={err})"))?;

    Ok(elevation.TokenIsElevated != 0)
}

/// Outcome of one `WNetGetConnectionW` call.
#[derive(Debug, PartialEq, Eq)]
enum Connection {
    Remote(String),
    Local,
    /// Buffer too small; the API updated the required length.
    Retry,
}

fn interpret_connection(
    drive: &str,
    status: WIN32_ERROR,
    remote_name: &[u16],
) -> anyhow::Result<Connection> {
    match status {
        // Remembered persistent mappings still report their remote name.
        NO_ERROR | ERROR_CONNECTION_UNAVAIL => {
            let end = remote_name
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(remote_name.len());
            Ok(Connection::Remote(String::from_utf16(&remote_name[..end])?))
        }
        ERROR_MORE_DATA => Ok(Connection::Retry),
        ERROR_NOT_CONNECTED | ERROR_BAD_DEVICE | ERROR_NO_NETWORK => Ok(Connection::Local),
        other => Err(ElevateError::ShareLookup {
            drive: drive.to_owned(),
            code: other.0,
        }
        .into()),
    }
}

pub fn share_name_for_drive(drive: &str) -> anyhow::Result<Option<String>> {
    let local_name = to_wide(drive);
    let mut len = MAX_PATH;

    loop {
        let mut remote_name = vec![0u16; usize::try_from(len)?];
        let status = unsafe {
            WNetGetConnectionW(
                PCWSTR(local_name.as_ptr()),
                Some(PWSTR(remote_name.as_mut_ptr())),
                &raw mut len,
            )
        };

        match interpret_connection(drive, status, &remote_name)? {
            Connection::Remote(share) => return Ok(Some(share)),
            Connection::Local => return Ok(None),
            Connection::Retry => {}
        }
    }
}

/// Launches through `ShellExecuteW`, which shows the UAC prompt for `runas`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellElevator;

impl ProcessElevator for ShellElevator {
    fn launch(&self, request: &LaunchRequest) -> anyhow::Result<()> {
        let verb = to_wide(request.verb.as_str());
        let file = to_wide(&request.executable);
        let parameters = to_wide(&request.parameters);

        let instance = unsafe {
            ShellExecuteW(
                None,
                PCWSTR(verb.as_ptr()),
                PCWSTR(file.as_ptr()),
                PCWSTR(parameters.as_ptr()),
                PCWSTR::null(),
                SW_SHOWNORMAL,
            )
        };

        let code = instance.0 as usize;
        if code <= 32 {
            return Err(ElevateError::Launch {
                executable: request.executable.clone(),
                code,
            }
            .into());
        }

        Ok(())
    }
}
