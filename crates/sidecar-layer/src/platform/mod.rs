mod platform_factory;

pub use platform_factory::{PlatformLauncher, PlatformSidecarFactory, PlatformTermination};
