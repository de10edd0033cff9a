//! Packaged resource lookup port

/// Read access to the app's compiled resource tables
///
/// Store reads keyed by a constant resource id resolve through this port;
/// an id the table does not know leaves the read symbolic.
pub trait ResourceTable: Send + Sync {
    /// String resource for a numeric id, `None` when unknown
    fn string_resource(&self, id: i64) -> Option<String>;
}

/// Table for programs whose resources were not extracted
#[derive(Debug, Default)]
pub struct EmptyResources;

impl ResourceTable for EmptyResources {
    fn string_resource(&self, _id: i64) -> Option<String> {
        None
    }
}
