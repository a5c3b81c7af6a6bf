//! Downloadable artefacts: the HTML document, its PNG rasterisation and the
//! geocoded CSV.

use crate::config::ExportConfig;
use crate::error::ExportError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const HTML_FILE_NAME: &str = "carte.html";
pub const PNG_FILE_NAME: &str = "carte.png";
pub const CSV_FILE_NAME: &str = "lat_long.csv";

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

const BROWSER_CANDIDATES: [&str; 5] = [
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

pub fn html_data_uri(html: &str) -> String {
    format!("data:text/html;base64,{}", STANDARD.encode(html.as_bytes()))
}

pub trait Rasterizer {
    fn rasterize(&self, html: &str, transparent: bool) -> Result<Vec<u8>, ExportError>;
}

/// Screenshots a document with a headless Chromium.
pub struct ChromeRasterizer {
    binary: PathBuf,
    width: u32,
    height: u32,
    virtual_time_budget_ms: u64,
    timeout: Duration,
}

impl ChromeRasterizer {
    pub fn new(binary: PathBuf, config: &ExportConfig) -> Self {
        Self {
            binary,
            width: config.width,
            height: config.height,
            virtual_time_budget_ms: config.virtual_time_budget_ms,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Uses the configured binary, else the first known browser on `PATH`.
    pub fn from_config(config: &ExportConfig) -> Result<Self, ExportError> {
        let binary = match &config.browser {
            Some(path) => path.clone(),
            None => find_browser(env::var_os("PATH"))
                .ok_or_else(|| ExportError::BrowserNotFound(format!("tried {}", BROWSER_CANDIDATES.join(", "))))?,
        };
        Ok(Self::new(binary, config))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn args(&self, page: &Path, screenshot: &Path, transparent: bool) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--headless".into(),
            "--no-sandbox".into(),
            "--disable-dev-shm-usage".into(),
            "--disable-gpu".into(),
            "--hide-scrollbars".into(),
            "--no-first-run".into(),
            format!("--window-size={},{}", self.width, self.height).into(),
            format!("--virtual-time-budget={}", self.virtual_time_budget_ms).into(),
        ];
        if transparent {
            args.push("--default-background-color=00000000".into());
        }
        let mut shot = OsString::from("--screenshot=");
        shot.push(screenshot);
        args.push(shot);
        let mut url = OsString::from("file://");
        url.push(page);
        args.push(url);
        args
    }
}

impl Rasterizer for ChromeRasterizer {
    fn rasterize(&self, html: &str, transparent: bool) -> Result<Vec<u8>, ExportError> {
        let workdir = tempfile::tempdir()?;
        let page = workdir.path().join(HTML_FILE_NAME);
        let screenshot = workdir.path().join(PNG_FILE_NAME);
        fs::write(&page, html)?;

        let mut cmd = Command::new(&self.binary);
        cmd.args(self.args(&page, &screenshot, transparent))
            .env("HOME", workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        info!("Rasterising map with {:?} at {}x{}", self.binary, self.width, self.height);
        let child = cmd.spawn().map_err(|source| ExportError::BrowserLaunch {
            binary: self.binary.display().to_string(),
            source,
        })?;
        let mut browser = BrowserProcess(child);
        let status = browser.wait_timeout(self.timeout)?;
        debug!("Browser exited with {}", status);

        let png = match fs::read(&screenshot) {
            Ok(bytes) => bytes,
            Err(_) => {
                return Err(ExportError::CaptureFailed(format!("no screenshot written ({status})")))
            }
        };
        if !png.starts_with(&PNG_SIGNATURE) {
            return Err(ExportError::CaptureFailed("screenshot is not a PNG".to_string()));
        }
        Ok(png)
    }
}

/// Owns the browser process; it is killed and reaped on every exit path.
struct BrowserProcess(Child);

impl BrowserProcess {
    fn wait_timeout(&mut self, timeout: Duration) -> Result<std::process::ExitStatus, ExportError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.0.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                return Err(ExportError::Timeout(timeout.as_secs()));
            }
            thread::sleep(Duration::from_millis(100));
        }
    }
}

impl Drop for BrowserProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.0.try_wait() {
            warn!("Killing browser process {}", self.0.id());
            let _ = self.0.kill();
        }
        let _ = self.0.wait();
    }
}

/// First browser candidate found in the given `PATH` value.
pub fn find_browser(path_var: Option<OsString>) -> Option<PathBuf> {
    let path_var = path_var?;
    env::split_paths(&path_var)
        .flat_map(|dir| BROWSER_CANDIDATES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ExportConfig {
        ExportConfig {
            browser: Some(PathBuf::from("/definitely/not/a/browser")),
            ..Default::default()
        }
    }

    #[test]
    fn data_uri_is_base64_html() {
        assert_eq!(html_data_uri("<p>hé</p>"), "data:text/html;base64,PHA+aMOpPC9wPg==");
    }

    #[test]
    fn missing_binary_is_a_launch_error() {
        let rasterizer = ChromeRasterizer::from_config(&config()).unwrap();
        let err = rasterizer.rasterize("<html></html>", true).unwrap_err();
        assert!(matches!(err, ExportError::BrowserLaunch { .. }), "got {err:?}");
    }

    #[test]
    fn args_carry_viewport_and_background() {
        let rasterizer = ChromeRasterizer::from_config(&config()).unwrap();
        let args = rasterizer.args(Path::new("/tmp/x/carte.html"), Path::new("/tmp/x/carte.png"), true);
        let args: Vec<String> = args.into_iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"--window-size=2400,1600".to_string()));
        assert!(args.contains(&"--default-background-color=00000000".to_string()));
        assert!(args.contains(&"--screenshot=/tmp/x/carte.png".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("file:///tmp/x/carte.html"));

        let opaque = rasterizer.args(Path::new("/a.html"), Path::new("/a.png"), false);
        assert!(!opaque.iter().any(|a| a.to_string_lossy().starts_with("--default-background-color")));
    }

    #[test]
    fn finds_browser_on_path() {
        let dir = tempfile::tempdir().unwrap();
        let empty = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("google-chrome"), "").unwrap();

        let path = env::join_paths([empty.path(), dir.path()]).unwrap();
        assert_eq!(find_browser(Some(path)), Some(dir.path().join("google-chrome")));
        assert_eq!(find_browser(Some(empty.path().as_os_str().to_owned())), None);
        assert_eq!(find_browser(None), None);
    }

    #[cfg(unix)]
    mod browser_process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn fake_browser(dir: &Path, body: &str) -> PathBuf {
            let script = dir.join("fake-chrome");
            fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
            script
        }

        fn rasterizer(binary: PathBuf, timeout_secs: u64) -> ChromeRasterizer {
            ChromeRasterizer::new(binary, &ExportConfig { timeout_secs, ..Default::default() })
        }

        // Writes its argument to the --screenshot= target.
        fn screenshot_script(content: &str) -> String {
            format!(
                "for a in \"$@\"; do case \"$a\" in --screenshot=*) printf '{content}' > \"${{a#--screenshot=}}\";; esac; done"
            )
        }

        #[test]
        fn hung_browser_is_killed_on_timeout() {
            let dir = tempfile::tempdir().unwrap();
            let pid_file = dir.path().join("pid");
            let script = fake_browser(dir.path(), &format!("echo $$ > '{}'\nexec sleep 30", pid_file.display()));

            let err = rasterizer(script, 1).rasterize("<html></html>", false).unwrap_err();
            assert!(matches!(err, ExportError::Timeout(1)), "got {err:?}");

            let pid = fs::read_to_string(&pid_file).unwrap();
            let alive = Command::new("sh")
                .arg("-c")
                .arg(format!("kill -0 {}", pid.trim()))
                .stderr(Stdio::null())
                .status()
                .unwrap()
                .success();
            assert!(!alive, "browser {} still running", pid.trim());
        }

        #[test]
        fn exit_without_screenshot_is_a_capture_failure() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_browser(dir.path(), "exit 0");

            let err = rasterizer(script, 5).rasterize("<html></html>", false).unwrap_err();
            assert!(matches!(err, ExportError::CaptureFailed(ref m) if m.starts_with("no screenshot")), "got {err:?}");
        }

        #[test]
        fn non_png_screenshot_is_rejected() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_browser(dir.path(), &screenshot_script("not a png"));

            let err = rasterizer(script, 5).rasterize("<html></html>", false).unwrap_err();
            assert!(matches!(err, ExportError::CaptureFailed(ref m) if m.contains("not a PNG")), "got {err:?}");
        }

        #[test]
        fn png_screenshot_is_returned() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_browser(dir.path(), &screenshot_script("\\211PNG\\r\\n\\032\\n"));

            let png = rasterizer(script, 5).rasterize("<html></html>", true).unwrap();
            assert_eq!(png, PNG_SIGNATURE);
        }
    }
}
