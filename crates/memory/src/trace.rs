//! Allocation tracing
//!
//! When a [`TieredAllocator`](crate::allocator::TieredAllocator) is built with
//! `debug` enabled, every allocation attempt produces one [`AllocEvent`] and
//! hands it to an [`AllocLogger`]. Loggers are fire-and-forget: they return
//! nothing and must not block or panic.
//!
//! The default logger forwards to `tracing` at `TRACE` level under the
//! `strata_memory::alloc` target (feature `logging`); without the feature the
//! default is [`NoopLogger`].

use core::fmt;

use crate::allocator::Tier;

/// One allocation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocEvent {
    /// Tier the caller asked for
    pub tier: Tier,
    /// Size the caller asked for, before word rounding
    pub requested: usize,
    /// Address handed out, `None` when every tier failed
    pub address: Option<usize>,
    /// The requested tier could not serve the call and the heap was tried
    pub fallback: bool,
}

impl AllocEvent {
    /// Whether the caller received memory
    #[inline]
    pub fn succeeded(&self) -> bool {
        self.address.is_some()
    }
}

impl fmt::Display for AllocEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alloc tier={} size={}B ", self.tier, self.requested)?;
        match self.address {
            Some(addr) => write!(f, "{addr:#x} succeeded")?,
            None => write!(f, "failed")?,
        }
        if self.fallback {
            write!(f, " (fallback on heap)")?;
        }
        Ok(())
    }
}

/// Sink for allocation trace records
pub trait AllocLogger: Send + Sync {
    /// Record one allocation attempt
    fn log(&self, event: &AllocEvent);
}

/// Logger that discards all events
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl AllocLogger for NoopLogger {
    fn log(&self, _event: &AllocEvent) {}
}

/// Logger that emits `tracing` events
#[cfg(feature = "logging")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

#[cfg(feature = "logging")]
impl AllocLogger for TracingLogger {
    fn log(&self, event: &AllocEvent) {
        let address = match event.address {
            Some(addr) => format!("{addr:#x}"),
            None => String::from("none"),
        };
        tracing::trace!(
            target: "strata_memory::alloc",
            tier = %event.tier,
            size = event.requested,
            address = %address,
            succeeded = event.succeeded(),
            fallback = event.fallback,
            "allocation"
        );
    }
}

impl<F> AllocLogger for F
where
    F: Fn(&AllocEvent) + Send + Sync,
{
    fn log(&self, event: &AllocEvent) {
        self(event);
    }
}

/// The logger used when none is supplied
pub fn default_logger() -> Box<dyn AllocLogger> {
    #[cfg(feature = "logging")]
    {
        Box::new(TracingLogger)
    }
    #[cfg(not(feature = "logging"))]
    {
        Box::new(NoopLogger)
    }
}
