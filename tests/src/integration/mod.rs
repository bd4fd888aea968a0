//! # Integration Flows
//!
//! Each module drives a running `GateService` (or the gate directly, for the
//! property tests) across module boundaries: dispatcher, gate, fail-safe
//! timer, TC store, fabric table and storage adapter together.

pub mod acceptance;
pub mod fabrics;
pub mod persistence;

#[cfg(test)]
pub(crate) mod fixtures {
    use commissioning_gate::{
        CommissioningGate, GateConfig, GateHandle, GateService, InMemoryKVStore, KeyValueStore,
        TokioClock,
    };
    use tokio::task::JoinHandle;

    use crate::harness::TestCommissioner;

    pub type ServiceTask<S> = JoinHandle<CommissioningGate<S, TokioClock>>;

    /// Spawn a service over an empty in-memory store.
    pub fn spawn_gate(config: GateConfig) -> (GateHandle, ServiceTask<InMemoryKVStore>) {
        spawn_over(config, InMemoryKVStore::new())
    }

    pub fn spawn_over<S: KeyValueStore + 'static>(
        config: GateConfig,
        store: S,
    ) -> (GateHandle, ServiceTask<S>) {
        let gate = CommissioningGate::boot(config, store, TokioClock::new())
            .expect("gate should boot");
        GateService::spawn(gate, 16)
    }

    pub fn commissioner(config: GateConfig) -> (TestCommissioner, ServiceTask<InMemoryKVStore>) {
        let (handle, task) = spawn_gate(config);
        (TestCommissioner::new(handle), task)
    }
}
