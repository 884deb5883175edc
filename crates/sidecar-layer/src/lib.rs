//! Supervises the local API sidecar that backs a desktop shell
//!
//! [`Sidecar`] ties together executable resolution, the platform launcher and
//! the platform termination strategy. The platform pieces are selected at
//! compile time by [`PlatformSidecarFactory`].

mod platform;
mod sidecar;

pub use platform::{PlatformLauncher, PlatformSidecarFactory, PlatformTermination};
pub use sidecar::Sidecar;
pub use sidecar_layer_core::*;
