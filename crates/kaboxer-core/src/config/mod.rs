//! Application descriptors, descriptor discovery and runtime settings

mod loader;
mod settings;
mod types;

pub use loader::{ConfigLoader, LoadedConfig, DEFAULT_CONFIG_PATHS};
pub use settings::{
    RuntimeSettings, CONFIG_PATHS_ENV, DEFAULT_RUNTIME_CONFIG, DEFAULT_TARBALL_PATHS,
    RUNTIME_CONFIG_ENV,
};
pub use types::{
    strip_scheme, AppConfig, ApplicationSection, ContainerSection, OriginSection,
    PackagingSection, RegistryOrigin, LOCAL_IMAGE_NAMESPACE,
};
