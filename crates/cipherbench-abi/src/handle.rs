//! Owned backend-handle wrapper with scoped release.

use std::sync::Arc;

use crate::bridge::{ApiBridge, STATUS_SUCCESS, Status};
use crate::types::Handle;

/// Exclusive owner of one backend handle.
///
/// The guard releases its handle exactly once: either explicitly through
/// [`HandleGuard::destroy`] or on drop. Detaching transfers ownership out
/// and neutralizes the guard. The type is deliberately not `Clone`; moving
/// the guard moves ownership of the handle with it.
pub struct HandleGuard {
    handle: Handle,
    bridge: Arc<dyn ApiBridge>,
}

impl HandleGuard {
    /// Wraps a handle produced by `bridge`.
    #[must_use]
    pub fn new(bridge: Arc<dyn ApiBridge>, handle: Handle) -> Self {
        Self { handle, bridge }
    }

    /// An empty guard; destroying it is a no-op.
    #[must_use]
    pub fn empty(bridge: Arc<dyn ApiBridge>) -> Self {
        Self {
            handle: Handle::default(),
            bridge,
        }
    }

    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    /// Releases ownership without destroying the backend resource.
    pub fn detach(&mut self) -> Handle {
        std::mem::take(&mut self.handle)
    }

    /// Destroys the owned handle now. No-op when empty; the guard is empty
    /// afterwards, so a later drop cannot double-release.
    pub fn destroy(&mut self) -> Status {
        if self.handle.is_empty() {
            return STATUS_SUCCESS;
        }
        let h = self.detach();
        self.bridge.destroy_handle(h)
    }

    /// Replaces the owned handle, destroying the previous one first.
    pub fn replace(&mut self, handle: Handle) {
        self.destroy();
        self.handle = handle;
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for HandleGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleGuard")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::bridge::{STATUS_INVALID_ARGS, Status};
    use crate::types::{
        BenchmarkDescriptor, PackedDataSink, PackedDataView, ParameterIndexer, WorkloadParam,
    };

    #[derive(Default)]
    struct CountingBridge {
        destroyed: AtomicU64,
    }

    impl ApiBridge for CountingBridge {
        fn init_engine(&self, _: &[u8], _: &mut Handle) -> Status {
            STATUS_SUCCESS
        }
        fn destroy_handle(&self, h: Handle) -> Status {
            if h.is_empty() {
                return STATUS_INVALID_ARGS;
            }
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            STATUS_SUCCESS
        }
        fn count_benchmarks(&self, _: Handle, _: &mut u64) -> Status {
            STATUS_SUCCESS
        }
        fn describe_benchmark(
            &self,
            _: Handle,
            _: u64,
            _: &mut Handle,
            _: &mut BenchmarkDescriptor,
        ) -> Status {
            STATUS_SUCCESS
        }
        fn workload_params_count(&self, _: Handle, _: Handle, _: &mut u64) -> Status {
            STATUS_SUCCESS
        }
        fn scheme_name(&self, _: Handle, _: u32, _: &mut String) -> Status {
            STATUS_SUCCESS
        }
        fn security_name(&self, _: Handle, _: u32, _: u32, _: &mut String) -> Status {
            STATUS_SUCCESS
        }
        fn extra_description(
            &self,
            _: Handle,
            _: Handle,
            _: &[WorkloadParam],
            _: &mut String,
        ) -> Status {
            STATUS_SUCCESS
        }
        fn create_benchmark(
            &self,
            _: Handle,
            _: Handle,
            _: &[WorkloadParam],
            _: &mut Handle,
        ) -> Status {
            STATUS_SUCCESS
        }
        fn init_benchmark(&self, _: Handle, _: &BenchmarkDescriptor) -> Status {
            STATUS_SUCCESS
        }
        fn encode(&self, _: Handle, _: &PackedDataView<'_>, _: &mut Handle) -> Status {
            STATUS_SUCCESS
        }
        fn decode(&self, _: Handle, _: Handle, _: &mut PackedDataSink<'_>) -> Status {
            STATUS_SUCCESS
        }
        fn encrypt(&self, _: Handle, _: Handle, _: &mut Handle) -> Status {
            STATUS_SUCCESS
        }
        fn decrypt(&self, _: Handle, _: Handle, _: &mut Handle) -> Status {
            STATUS_SUCCESS
        }
        fn load(&self, _: Handle, _: &[Handle], _: &mut Handle) -> Status {
            STATUS_SUCCESS
        }
        fn store(&self, _: Handle, _: Handle, _: &mut [Handle]) -> Status {
            STATUS_SUCCESS
        }
        fn operate(
            &self,
            _: Handle,
            _: Handle,
            _: &[ParameterIndexer],
            _: &mut Handle,
        ) -> Status {
            STATUS_SUCCESS
        }
        fn last_error_description(&self) -> String {
            String::new()
        }
    }

    fn live_handle() -> Handle {
        Handle {
            p: 7,
            size: 16,
            tag: 1,
        }
    }

    #[test]
    fn destroy_releases_exactly_once() {
        let bridge = Arc::new(CountingBridge::default());
        let mut guard = HandleGuard::new(bridge.clone(), live_handle());
        assert_eq!(guard.destroy(), STATUS_SUCCESS);
        assert!(guard.is_empty());
        // second destroy and the drop are both no-ops
        assert_eq!(guard.destroy(), STATUS_SUCCESS);
        drop(guard);
        assert_eq!(bridge.destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases_owned_handle() {
        let bridge = Arc::new(CountingBridge::default());
        {
            let _guard = HandleGuard::new(bridge.clone(), live_handle());
        }
        assert_eq!(bridge.destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detach_transfers_ownership() {
        let bridge = Arc::new(CountingBridge::default());
        let mut guard = HandleGuard::new(bridge.clone(), live_handle());
        let h = guard.detach();
        assert!(!h.is_empty());
        drop(guard);
        assert_eq!(bridge.destroyed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn replace_destroys_previous() {
        let bridge = Arc::new(CountingBridge::default());
        let mut guard = HandleGuard::new(bridge.clone(), live_handle());
        guard.replace(Handle {
            p: 9,
            size: 8,
            tag: 2,
        });
        assert_eq!(bridge.destroyed.load(Ordering::SeqCst), 1);
        drop(guard);
        assert_eq!(bridge.destroyed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn destroy_on_empty_is_noop() {
        let bridge = Arc::new(CountingBridge::default());
        let mut guard = HandleGuard::empty(bridge.clone());
        assert_eq!(guard.destroy(), STATUS_SUCCESS);
        assert_eq!(bridge.destroyed.load(Ordering::SeqCst), 0);
    }
}
