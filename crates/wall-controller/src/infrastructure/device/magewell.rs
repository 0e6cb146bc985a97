//! Magewell `mwapi` HTTP device client.
//!
//! Magewell encoders expose a single GET endpoint of the form
//! `http://<host>/mwapi?method=<name>&<params>`. Authentication is a `login`
//! call carrying the username and the MD5 digest of the password; the device
//! answers with a `sid` session cookie that must accompany every later call.
//! Every response body is JSON with a numeric `status` field, `0` meaning
//! success.
//!
//! The session cookie is cached and re-established lazily: the first call
//! after a rejection logs in again.

use tokio::sync::Mutex;
use tracing::{debug, warn};

use wall_core::Resolution;

use super::{DeviceClient, DeviceError, SignalInfo};

/// Client for one Magewell encoder.
pub struct MagewellClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password_md5: String,
    /// Cached `sid=…` cookie from the last successful login.
    session: Mutex<Option<String>>,
}

impl MagewellClient {
    pub fn new(host: &str, username: &str, password: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("http://{host}/mwapi?method="),
            username: username.to_string(),
            // The mwapi login endpoint takes the MD5 hex digest, never the
            // cleartext password.
            password_md5: format!("{:x}", md5::compute(password.as_bytes())),
            session: Mutex::new(None),
        }
    }

    /// Logs in and returns the `sid=…` cookie from the `Set-Cookie` header.
    async fn login(&self) -> Result<String, DeviceError> {
        let url = format!(
            "{}login&id={}&pass={}",
            self.base_url, self.username, self.password_md5
        );
        let response = self.http.get(&url).send().await?;

        let sid = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|cookie| cookie.split(';').next())
            .map(str::trim)
            .find(|cookie| cookie.starts_with("sid="))
            .map(str::to_string)
            .ok_or_else(|| DeviceError::Auth("login response carried no sid cookie".to_string()))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DeviceError::Protocol(e.to_string()))?;
        let status = body.get("status").and_then(|s| s.as_i64()).unwrap_or(-1);
        if status != 0 {
            return Err(DeviceError::Auth(format!("login rejected with status {status}")));
        }

        debug!(device = %self.base_url, "mwapi login succeeded");
        Ok(sid)
    }

    async fn session_cookie(&self) -> Result<String, DeviceError> {
        let mut guard = self.session.lock().await;
        if let Some(sid) = guard.as_ref() {
            return Ok(sid.clone());
        }
        let sid = self.login().await?;
        *guard = Some(sid.clone());
        Ok(sid)
    }

    /// Issues one `mwapi` call and returns the parsed JSON body.
    ///
    /// A non-zero `status` invalidates the cached session so the next call
    /// logs in again — expired sessions are the common cause.
    async fn call(&self, method_and_params: &str) -> Result<serde_json::Value, DeviceError> {
        let sid = self.session_cookie().await?;
        let url = format!("{}{}", self.base_url, method_and_params);

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::COOKIE, sid)
            .send()
            .await?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DeviceError::Protocol(e.to_string()))?;

        let status = body.get("status").and_then(|s| s.as_i64()).unwrap_or(-1);
        if status != 0 {
            warn!(method = method_and_params, status, "mwapi call rejected");
            *self.session.lock().await = None;
            let method = method_and_params.split('&').next().unwrap_or(method_and_params);
            return Err(DeviceError::Rejected(format!("mwapi status {status} for {method}")));
        }
        Ok(body)
    }
}

fn read_dimension(value: &serde_json::Value, key: &str) -> Result<u32, DeviceError> {
    value
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as u32)
        .ok_or_else(|| DeviceError::Protocol(format!("response missing '{key}'")))
}

#[async_trait::async_trait]
impl DeviceClient for MagewellClient {
    async fn apply_resolution(&self, desired: Resolution) -> Result<Resolution, DeviceError> {
        self.call(&format!(
            "set-video-config&out-raw-resolution=false&out-cx={}&out-cy={}&out-fr-convertion=half",
            desired.width, desired.height
        ))
        .await?;
        // The device may clamp to the nearest supported mode; read back what
        // it actually applied rather than trusting the request.
        self.current_resolution().await
    }

    async fn current_resolution(&self) -> Result<Resolution, DeviceError> {
        let body = self.call("get-video-config").await?;
        Ok(Resolution::new(
            read_dimension(&body, "out-cx")?,
            read_dimension(&body, "out-cy")?,
        ))
    }

    async fn signal_info(&self) -> Result<SignalInfo, DeviceError> {
        let body = self.call("get-signal-info").await?;
        // Signal properties are nested under "video-info" on current
        // firmware; older firmware reports them at the top level.
        let video = body.get("video-info").unwrap_or(&body);
        Ok(SignalInfo {
            width: read_dimension(video, "width")?,
            height: read_dimension(video, "height")?,
            frame_rate: video.get("frame-rate").and_then(|v| v.as_f64()),
            interlaced: video.get("interlaced").and_then(|v| v.as_bool()),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
