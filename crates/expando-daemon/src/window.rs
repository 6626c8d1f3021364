use expando_core::{ActiveWindow, Result, WindowResolver};

/// Foreground window lookup for the current platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformResolver;

impl PlatformResolver {
    pub fn new() -> Self {
        Self
    }
}

impl WindowResolver for PlatformResolver {
    fn active_window(&self) -> Result<ActiveWindow> {
        platform::active_window()
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use cocoa::base::{id, nil};
    use cocoa::foundation::NSString;
    use expando_core::{ActiveWindow, ExpandoError, Result};
    use objc::{class, msg_send, sel, sel_impl};
    use std::ffi::CStr;

    unsafe fn to_string(value: id) -> Option<String> {
        if value == nil {
            return None;
        }
        let cstr = NSString::UTF8String(value);
        if cstr.is_null() {
            return None;
        }
        Some(CStr::from_ptr(cstr).to_string_lossy().into_owned())
    }

    /// The frontmost application's name. Reading other apps' window titles
    /// needs screen recording permission, so the bundle identifier stands in
    /// for the title.
    pub fn active_window() -> Result<ActiveWindow> {
        unsafe {
            let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
            if workspace == nil {
                return Err(ExpandoError::ResolverUnavailable(
                    "no shared workspace".to_string(),
                ));
            }
            let app: id = msg_send![workspace, frontmostApplication];
            if app == nil {
                return Err(ExpandoError::ResolverUnavailable(
                    "no frontmost application".to_string(),
                ));
            }
            let name: id = msg_send![app, localizedName];
            let bundle: id = msg_send![app, bundleIdentifier];
            let name = to_string(name).ok_or_else(|| {
                ExpandoError::ResolverUnavailable("application has no name".to_string())
            })?;
            Ok(ActiveWindow::new(name, to_string(bundle).unwrap_or_default()))
        }
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use expando_core::{ActiveWindow, ExpandoError, Result};
    use std::path::Path;
    use windows::core::PWSTR;
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{
        OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
        PROCESS_QUERY_LIMITED_INFORMATION,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId,
    };

    pub fn active_window() -> Result<ActiveWindow> {
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.0 == 0 {
                return Err(ExpandoError::ResolverUnavailable(
                    "no foreground window".to_string(),
                ));
            }

            let mut title = [0u16; 512];
            let len = GetWindowTextW(hwnd, &mut title).max(0) as usize;
            let title = String::from_utf16_lossy(&title[..len]);

            let mut pid = 0u32;
            GetWindowThreadProcessId(hwnd, Some(&mut pid as *mut u32));
            if pid == 0 {
                return Err(ExpandoError::ResolverUnavailable(
                    "foreground window has no process".to_string(),
                ));
            }

            Ok(ActiveWindow::new(process_name(pid)?, title))
        }
    }

    unsafe fn process_name(pid: u32) -> Result<String> {
        let process = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid)
            .map_err(|err| ExpandoError::ResolverUnavailable(err.to_string()))?;

        let mut buffer = [0u16; 1024];
        let mut size = buffer.len() as u32;
        let queried = QueryFullProcessImageNameW(
            process,
            PROCESS_NAME_WIN32,
            PWSTR(buffer.as_mut_ptr()),
            &mut size,
        );
        let _ = CloseHandle(process);
        queried.map_err(|err| ExpandoError::ResolverUnavailable(err.to_string()))?;

        let path = String::from_utf16_lossy(&buffer[..size as usize]);
        Ok(Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(path))
    }
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
mod platform {
    use expando_core::{ActiveWindow, ExpandoError, Result};
    use std::fs;
    use std::process::Command;

    fn xdotool(args: &[&str]) -> Result<String> {
        let output = Command::new("xdotool").args(args).output().map_err(|err| {
            ExpandoError::ResolverUnavailable(format!("xdotool not available: {}", err))
        })?;
        if !output.status.success() {
            return Err(ExpandoError::ResolverUnavailable(format!(
                "xdotool {} failed",
                args.join(" ")
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// X11 only. Wayland compositors do not expose the focused window.
    pub fn active_window() -> Result<ActiveWindow> {
        let title = xdotool(&["getactivewindow", "getwindowname"])?;
        let pid = xdotool(&["getactivewindow", "getwindowpid"])?;
        let process = fs::read_to_string(format!("/proc/{}/comm", pid))
            .map(|comm| comm.trim().to_string())
            .map_err(|err| {
                ExpandoError::ResolverUnavailable(format!("process {}: {}", pid, err))
            })?;
        Ok(ActiveWindow::new(process, title))
    }
}
