// # Feed Source Trait
//
// Defines the interface for fetching snapshots of the flight board.
//
// ## Implementations
//
// - HTTP + JSON: `flightboard-feed-http` crate
//
// ## Usage
//
// ```rust,ignore
// use flightboard_core::FeedSource;
//
// async fn poll(source: &mut dyn FeedSource) -> flightboard_core::Result<()> {
//     source.connect().await?;
//     let snapshot = source.fetch().await?;
//     println!("{} flight(s) on the board", snapshot.records.len());
//     source.disconnect().await;
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::flight::FeedSnapshot;

/// Trait for feed source implementations
///
/// A feed source owns whatever resource it fetches with (an HTTP client, a
/// connection pool). The engine acquires it with [`FeedSource::connect`] when
/// it starts and releases it with [`FeedSource::disconnect`] when it stops,
/// on every exit path.
///
/// # Responsibilities
///
/// - ✅ Perform the fetch and decode the body into records
/// - ✅ Count elements that are not valid records instead of failing the snapshot
/// - ✅ Report transport and decoding failures as errors
/// - ❌ Retry or sleep (the engine simply tries again next tick)
/// - ❌ Track flights or decide what to post (owned by the engine)
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Acquire the fetch-capable resource
    async fn connect(&mut self) -> Result<(), crate::Error> {
        Ok(())
    }

    /// Fetch the current snapshot
    ///
    /// # Returns
    ///
    /// - `Ok(snapshot)`: At least one decodable record
    /// - `Err(Error)`: Network failure, non-success status, invalid or empty body
    async fn fetch(&self) -> Result<FeedSnapshot, crate::Error>;

    /// Release the resource acquired by `connect`
    async fn disconnect(&mut self) {}

    /// Source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing feed sources from configuration
pub trait FeedSourceFactory: Send + Sync {
    /// Create a FeedSource instance from configuration
    fn create(
        &self,
        config: &crate::config::FeedConfig,
    ) -> Result<Box<dyn FeedSource>, crate::Error>;
}
