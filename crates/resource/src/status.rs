//! Observable resource state

use crate::error::ResourceError;

/// Progress and failures of a resource's loads and saves
///
/// `is_loading` and `is_saving` are independent; both can be true while a
/// change is made during hydration.
#[derive(Debug, Clone, Default)]
pub struct ResourceStatus {
    /// The initial load is running
    pub is_loading: bool,
    /// The initial load has finished, successfully or not
    pub is_hydrated: bool,
    /// At least one save is queued or running
    pub is_saving: bool,
    /// Failure of the last load or refresh
    pub load_error: Option<ResourceError>,
    /// Failure of the last save; cleared when a new change is made
    pub save_error: Option<ResourceError>,
}

/// A resource's value together with its status
#[derive(Debug, Clone)]
pub struct ResourceSnapshot<T> {
    /// Current in-memory value
    pub data: T,
    /// Load and save state
    pub status: ResourceStatus,
}
