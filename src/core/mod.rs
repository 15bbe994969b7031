pub mod capability;
pub mod collaborators;
pub mod config;
pub mod conversations;
pub mod overlay;
pub mod session;
pub mod snapshot;
