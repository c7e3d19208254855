//! The switch runtime.
//!
//! Control logic for one relay unit, split along the seams that matter at
//! runtime:
//!
//! ```text
//! switch/
//! ├── bridge.rs      - interrupt-to-loop command cell
//! ├── button.rs      - press/release edge machine and gesture timing
//! ├── relay.rs       - relay + status LED output and state notification
//! ├── router.rs      - inbound topic classification
//! ├── supervisor.rs  - link and session connectivity
//! └── device.rs      - bring-up sequence and the control loop
//! ```
//!
//! Physical edges travel: GPIO interrupt → [`bridge::CommandBridge`] → one
//! drain per loop pass → [`button::ButtonGestureDetector`] or sensor readout
//! → [`relay::RelayController`] → retained publish over the supervised
//! session. Remote commands travel the other way through
//! [`router::MessageRouter`]. Everything except the bridge runs on the
//! single loop thread and needs no synchronization.

pub mod bridge;
pub mod button;
pub mod device;
pub mod relay;
pub mod router;
pub mod supervisor;

pub use bridge::{Command, CommandBridge};
pub use device::{DeviceError, Profile, Switch};
