//! Suffixes for probe log streams.

/// Produces the unique tail of each probe log stream name.
///
/// Stream names are `<prefix>/<container>/ecs-reconcile-verify-<suffix>`, so
/// two verify runs against the same log group never write to one stream.
pub trait IdGenerator: Send + Sync {
    /// Returns a suffix no earlier call has returned.
    fn stream_suffix(&self) -> String;
}
