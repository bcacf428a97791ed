// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Owner and group resolution.
//!
//! Resolution failures never abort extraction: callers always get *some*
//! string back, falling back to the numeric id or a platform constant.

/// Resolved owner and group names for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    /// Resolved (or best-effort) owner name.
    pub owner: String,
    /// Resolved (or best-effort) group name.
    pub group: String,
}

#[cfg(unix)]
pub fn resolve(uid: u32, gid: u32) -> Owner {
    let owner = uzers::get_user_by_uid(uid)
        .map(|u| u.name().to_string_lossy().into_owned())
        .unwrap_or_else(|| uid.to_string());
    let group = uzers::get_group_by_gid(gid)
        .map(|g| g.name().to_string_lossy().into_owned())
        .unwrap_or_else(|| os_name().to_string());
    Owner { owner, group }
}

#[cfg(windows)]
pub fn resolve(path: &std::path::Path) -> Owner {
    let owner = windows::owner_of(path).unwrap_or_else(|| "UNKNOWN".to_string());
    Owner { owner, group: "Windows".to_string() }
}

/// Returns the name of the host OS, used as the group fallback on POSIX
/// when `getgrgid` fails.
#[cfg(unix)]
fn os_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "Darwin"
    } else if cfg!(target_os = "freebsd") {
        "FreeBSD"
    } else {
        "Linux"
    }
}

#[cfg(windows)]
mod windows {
    use std::ffi::c_void;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use windows_sys::Win32::Foundation::{LocalFree, HLOCAL};
    use windows_sys::Win32::Security::Authorization::{
        GetNamedSecurityInfoW, SE_FILE_OBJECT,
    };
    use windows_sys::Win32::Security::{
        LookupAccountSidW, OWNER_SECURITY_INFORMATION, PSID,
    };

    /// Reads the owner of `path` from its security descriptor.
    ///
    /// Returns `None` on any failure; the caller substitutes a fallback
    /// string, as owner resolution must never abort extraction.
    pub fn owner_of(path: &Path) -> Option<String> {
        let wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        let mut owner_sid: PSID = std::ptr::null_mut();
        let mut descriptor: *mut c_void = std::ptr::null_mut();

        // SAFETY: `wide` is a valid, NUL-terminated wide string for the
        // lifetime of this call; `owner_sid`/`descriptor` are out
        // parameters populated by the API on success and freed below.
        let status = unsafe {
            GetNamedSecurityInfoW(
                wide.as_ptr(),
                SE_FILE_OBJECT,
                OWNER_SECURITY_INFORMATION,
                &mut owner_sid,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                &mut descriptor,
            )
        };
        if status != 0 || owner_sid.is_null() {
            return None;
        }

        let name = lookup_account(owner_sid);

        // SAFETY: `descriptor` was allocated by `GetNamedSecurityInfoW` and
        // must be released with `LocalFree` once we're done reading it.
        unsafe {
            LocalFree(descriptor as HLOCAL);
        }

        name
    }

    fn lookup_account(sid: PSID) -> Option<String> {
        let mut name = vec![0u16; 256];
        let mut name_len = name.len() as u32;
        let mut domain = vec![0u16; 256];
        let mut domain_len = domain.len() as u32;
        let mut sid_name_use = 0;

        // SAFETY: all buffer pointers and their matching length out-params
        // are valid for the duration of this call.
        let ok = unsafe {
            LookupAccountSidW(
                std::ptr::null(),
                sid,
                name.as_mut_ptr(),
                &mut name_len,
                domain.as_mut_ptr(),
                &mut domain_len,
                &mut sid_name_use,
            )
        };
        if ok == 0 {
            return None;
        }

        name.truncate(name_len as usize);
        Some(String::from_utf16_lossy(&name))
    }
}
