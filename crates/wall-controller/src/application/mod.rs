//! Application layer use cases for the controller.
//!
//! Use cases in this layer orchestrate `wall_core` domain values against the
//! infrastructure seams (`DeviceClient`, `SceneClient`) without performing
//! any I/O of their own; all transports are injected as trait objects at
//! construction time.
//!
//! Sub-modules:
//!
//! - **`orchestrate`** – The configuration state machine. Drives one layout
//!   request from validation through device negotiation and scene
//!   application to the committed run record.
//!
//! - **`negotiate`** – Concurrent per-device resolution negotiation with
//!   isolated failure handling and the authoritative-resolution policy.
//!
//! - **`bindings`** – Maps logical tile slots to visualization-layer scene
//!   items by source name.
//!
//! - **`registry`** – In-memory registry of known devices and their
//!   last-known applied resolutions.

pub mod bindings;
pub mod negotiate;
pub mod orchestrate;
pub mod registry;
