/// Application state management for rs_tty
mod app_state;
mod registry;

pub use app_state::AppState;
pub use registry::{RegisteredSession, SessionRegistry};
