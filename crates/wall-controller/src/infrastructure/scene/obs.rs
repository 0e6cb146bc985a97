//! obs-websocket v5 scene client.
//!
//! OBS exposes its control surface as JSON frames over a WebSocket. Each
//! frame is `{"op": <code>, "d": {…}}`:
//!
//! - On connect OBS sends `Hello` (op 0); the client answers `Identify`
//!   (op 1) and waits for `Identified` (op 2) before issuing requests.
//! - A request is op 6 with a client-chosen `requestId`; the matching
//!   response arrives as op 7 carrying the same id. Event frames (op 5)
//!   interleave freely and are skipped here — the controller does not
//!   subscribe to any.
//!
//! The socket is a single stream, so requests are serialized behind a mutex:
//! one request is always fully answered before the next is written. That is
//! sufficient for the controller's traffic (a handful of calls per run).

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use uuid::Uuid;

use wall_core::TileTransform;

use super::{ItemTransform, SceneClient, SceneError, SceneItemId};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Scene client backed by an obs-websocket v5 connection.
pub struct ObsSceneClient {
    socket: Mutex<WsStream>,
    scene_name: String,
    /// Multiplier from canvas (base) size to encoded output size.
    output_scale: f64,
}

impl ObsSceneClient {
    /// Connects to `url` (e.g. `ws://127.0.0.1:4455`) and completes the
    /// Hello/Identify handshake.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Connection`] when the socket cannot be
    /// established and [`SceneError::Protocol`] when the handshake frames
    /// are not what obs-websocket v5 defines.
    pub async fn connect(
        url: &str,
        scene_name: &str,
        output_scale: f64,
    ) -> Result<Self, SceneError> {
        let (mut socket, _response) = connect_async(url)
            .await
            .map_err(|e| SceneError::Connection(e.to_string()))?;

        let hello = read_frame(&mut socket).await?;
        if hello.get("op").and_then(|o| o.as_i64()) != Some(0) {
            return Err(SceneError::Protocol(format!(
                "expected Hello (op 0), got {hello}"
            )));
        }

        let identify = json!({ "op": 1, "d": { "rpcVersion": 1 } });
        socket
            .send(WsMessage::Text(identify.to_string()))
            .await
            .map_err(|e| SceneError::Connection(e.to_string()))?;

        loop {
            let frame = read_frame(&mut socket).await?;
            match frame.get("op").and_then(|o| o.as_i64()) {
                Some(2) => break,
                Some(5) => continue,
                _ => {
                    return Err(SceneError::Protocol(format!(
                        "expected Identified (op 2), got {frame}"
                    )))
                }
            }
        }

        info!(url, scene = scene_name, "connected to obs-websocket");
        Ok(Self {
            socket: Mutex::new(socket),
            scene_name: scene_name.to_string(),
            output_scale,
        })
    }

    /// Issues one request and waits for its correlated response.
    async fn request(
        &self,
        request_type: &str,
        request_data: serde_json::Value,
    ) -> Result<serde_json::Value, SceneError> {
        let request_id = Uuid::new_v4().to_string();
        let frame = json!({
            "op": 6,
            "d": {
                "requestType": request_type,
                "requestId": request_id,
                "requestData": request_data,
            }
        });

        let mut socket = self.socket.lock().await;
        socket
            .send(WsMessage::Text(frame.to_string()))
            .await
            .map_err(|e| SceneError::Connection(e.to_string()))?;

        loop {
            let frame = read_frame(&mut socket).await?;
            if frame.get("op").and_then(|o| o.as_i64()) != Some(7) {
                // Event or unrelated frame; not for us.
                continue;
            }
            let d = &frame["d"];
            if d.get("requestId").and_then(|i| i.as_str()) != Some(request_id.as_str()) {
                continue;
            }

            let status = &d["requestStatus"];
            if status.get("result").and_then(|r| r.as_bool()) != Some(true) {
                let comment = status
                    .get("comment")
                    .and_then(|c| c.as_str())
                    .unwrap_or("request failed");
                return Err(SceneError::Rejected(format!("{request_type}: {comment}")));
            }

            debug!(request_type, "obs request acknowledged");
            return Ok(d.get("responseData").cloned().unwrap_or(serde_json::Value::Null));
        }
    }
}

/// Reads frames until a JSON text frame arrives.
///
/// Control frames (ping/pong) are answered by tungstenite itself and only
/// need to be skipped here.
async fn read_frame(socket: &mut WsStream) -> Result<serde_json::Value, SceneError> {
    loop {
        let message = socket
            .next()
            .await
            .ok_or_else(|| SceneError::Connection("websocket closed".to_string()))?
            .map_err(|e| SceneError::Connection(e.to_string()))?;

        match message {
            WsMessage::Text(text) => {
                return serde_json::from_str(&text).map_err(|e| SceneError::Protocol(e.to_string()))
            }
            WsMessage::Close(_) => {
                return Err(SceneError::Connection("websocket closed".to_string()))
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Binary(_) | WsMessage::Frame(_) => {
                continue
            }
        }
    }
}

#[async_trait::async_trait]
impl SceneClient for ObsSceneClient {
    async fn set_canvas_size(
        &self,
        width: u32,
        height: u32,
        fps_denominator: u32,
    ) -> Result<(), SceneError> {
        let output_width = (width as f64 * self.output_scale).round() as u32;
        let output_height = (height as f64 * self.output_scale).round() as u32;
        self.request(
            "SetVideoSettings",
            json!({
                "baseWidth": width,
                "baseHeight": height,
                "outputWidth": output_width,
                "outputHeight": output_height,
                "fpsDenominator": fps_denominator,
            }),
        )
        .await
        .map(|_| ())
    }

    async fn resolve_scene_items(
        &self,
        names: &[String],
    ) -> Result<std::collections::HashMap<String, SceneItemId>, SceneError> {
        let data = self
            .request("GetSceneItemList", json!({ "sceneName": self.scene_name }))
            .await?;
        let items = data
            .get("sceneItems")
            .and_then(|i| i.as_array())
            .ok_or_else(|| SceneError::Protocol("scene item list missing 'sceneItems'".to_string()))?;

        let mut resolved = std::collections::HashMap::new();
        for name in names {
            let item = items
                .iter()
                .find(|item| item.get("sourceName").and_then(|n| n.as_str()) == Some(name));
            if let Some(id) = item.and_then(|i| i.get("sceneItemId")).and_then(|i| i.as_u64()) {
                resolved.insert(name.clone(), id);
            }
        }
        Ok(resolved)
    }

    async fn set_item_transform(
        &self,
        id: SceneItemId,
        transform: &TileTransform,
    ) -> Result<(), SceneError> {
        self.request(
            "SetSceneItemTransform",
            json!({
                "sceneName": self.scene_name,
                "sceneItemId": id,
                "sceneItemTransform": {
                    "rotation": transform.rotation.degrees() as f64,
                    "alignment": transform.anchor.0,
                    "scaleX": transform.scale_x,
                    "scaleY": transform.scale_y,
                    "positionX": transform.position_x,
                    "positionY": transform.position_y,
                }
            }),
        )
        .await
        .map(|_| ())
    }

    async fn get_item_transform(&self, id: SceneItemId) -> Result<ItemTransform, SceneError> {
        let data = self
            .request(
                "GetSceneItemTransform",
                json!({ "sceneName": self.scene_name, "sceneItemId": id }),
            )
            .await?;
        let t = data
            .get("sceneItemTransform")
            .ok_or_else(|| SceneError::Protocol("response missing 'sceneItemTransform'".to_string()))?;

        Ok(ItemTransform {
            rotation: t.get("rotation").and_then(|v| v.as_f64()).unwrap_or(0.0),
            alignment: t.get("alignment").and_then(|v| v.as_u64()).unwrap_or(0) as u8,
            scale_x: t.get("scaleX").and_then(|v| v.as_f64()).unwrap_or(1.0),
            scale_y: t.get("scaleY").and_then(|v| v.as_f64()).unwrap_or(1.0),
            position_x: t.get("positionX").and_then(|v| v.as_f64()).unwrap_or(0.0),
            position_y: t.get("positionY").and_then(|v| v.as_f64()).unwrap_or(0.0),
        })
    }
}
