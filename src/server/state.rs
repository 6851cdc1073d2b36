use crate::config::Config;

/// Read-only at request time; no locking needed across concurrent
/// resolutions.
pub struct AppState {
    pub config: Config,
}
