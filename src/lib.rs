pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{ClientContext, bootstrap_workspace};
pub use application::controller::{SessionController, SessionIntent};
pub use application::runtime::{RuntimeHandle, RuntimeIntent, SessionRuntime};
pub use domain::models::{PresetId, SessionMode, SessionSnapshot};
pub use domain::view::{RenderSurface, ViewModel};
pub use infrastructure::error::InfraError;
