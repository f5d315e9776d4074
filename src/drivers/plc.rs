//! # PLC driver capability: create, read, dispose tag handles.
//!
//! The polled adapter owns one [`TagHandle`] per enabled tag entry, created
//! at adapter start and dropped at adapter stop. Handles never escape the
//! adapter.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{PlcAdapterConfig, TagConfig};
use crate::error::DriverError;
use crate::frames::TagValue;

/// Factory for protocol tag handles.
///
/// One driver instance serves a whole adapter; `create_handle` is called
/// once per enabled tag entry at adapter start. A per-tag failure here is
/// logged by the adapter and skips that tag — it is not fatal.
pub trait PlcDriver: Send + Sync + 'static {
    /// Creates the protocol handle for one tag.
    ///
    /// The connection parameters (gateway, path, timeout) come from the
    /// adapter configuration; the mapper kind selects the value shape the
    /// handle will produce.
    fn create_handle(
        &self,
        tag: &TagConfig,
        conn: &PlcAdapterConfig,
    ) -> Result<Box<dyn TagHandle>, DriverError>;
}

/// One readable protocol tag.
///
/// ### Contract
/// - `read` suspends the calling task, never the pool.
/// - A read that exceeds the configured timeout returns
///   [`DriverError::Timeout`]; a read interrupted by the token returns
///   [`DriverError::Canceled`].
/// - Dropping the handle disposes the underlying protocol resource.
#[async_trait]
pub trait TagHandle: Send {
    /// Reads the current tag value.
    async fn read(&mut self, token: &CancellationToken) -> Result<TagValue, DriverError>;
}
