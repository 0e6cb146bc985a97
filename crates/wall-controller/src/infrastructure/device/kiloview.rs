//! Kiloview NDI encoder REST client.
//!
//! Kiloview encoders expose a JSON REST API under `/api/v1/`. Every response
//! uses the envelope `{"result": "ok", "data": {…}}`; anything other than
//! `"ok"` is a rejection. Unlike the Magewell `mwapi` the endpoints are
//! unauthenticated on the control VLAN, so there is no session handling.

use serde_json::json;
use tracing::warn;

use wall_core::Resolution;

use super::{DeviceClient, DeviceError, SignalInfo};

/// Client for one Kiloview NDI encoder.
pub struct KiloviewClient {
    http: reqwest::Client,
    base_url: String,
}

impl KiloviewClient {
    pub fn new(host: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("http://{host}/api/v1"),
        }
    }

    /// Unwraps the `result`/`data` envelope, rejecting non-`ok` results.
    fn unwrap_envelope(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, DeviceError> {
        let result = body.get("result").and_then(|r| r.as_str()).unwrap_or("");
        if result != "ok" {
            warn!(path, result, "kiloview call rejected");
            return Err(DeviceError::Rejected(format!(
                "kiloview result '{result}' for {path}"
            )));
        }
        Ok(body.get("data").cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn get(&self, path: &str) -> Result<serde_json::Value, DeviceError> {
        let response = self.http.get(format!("{}/{path}", self.base_url)).send().await?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DeviceError::Protocol(e.to_string()))?;
        self.unwrap_envelope(path, body)
    }

    async fn post(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, DeviceError> {
        let response = self
            .http
            .post(format!("{}/{path}", self.base_url))
            .json(&payload)
            .send()
            .await?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DeviceError::Protocol(e.to_string()))?;
        self.unwrap_envelope(path, body)
    }
}

fn read_dimension(data: &serde_json::Value, key: &str) -> Result<u32, DeviceError> {
    data.get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as u32)
        .ok_or_else(|| DeviceError::Protocol(format!("response missing '{key}'")))
}

#[async_trait::async_trait]
impl DeviceClient for KiloviewClient {
    async fn apply_resolution(&self, desired: Resolution) -> Result<Resolution, DeviceError> {
        self.post(
            "encoder/ndi/set_config",
            json!({ "width": desired.width, "height": desired.height }),
        )
        .await?;
        // Read back the applied configuration; the encoder rounds to the
        // nearest mode its current frame rate supports.
        self.current_resolution().await
    }

    async fn current_resolution(&self) -> Result<Resolution, DeviceError> {
        let data = self.get("encoder/ndi/get_config").await?;
        Ok(Resolution::new(
            read_dimension(&data, "width")?,
            read_dimension(&data, "height")?,
        ))
    }

    async fn signal_info(&self) -> Result<SignalInfo, DeviceError> {
        let data = self.get("encoder/ndi/status").await?;
        Ok(SignalInfo {
            width: read_dimension(&data, "width")?,
            height: read_dimension(&data, "height")?,
            frame_rate: data.get("frame_rate").and_then(|v| v.as_f64()),
            interlaced: data.get("interlaced").and_then(|v| v.as_bool()),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
