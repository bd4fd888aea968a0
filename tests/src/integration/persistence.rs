//! # Reboot Persistence Flows
//!
//! Runs the service over a `FileBackedKVStore`, stops it, and boots a new
//! gate from the same file:
//!
//! - TC acceptance and committed fabrics survive the reboot
//! - An attempt interrupted by the reboot is discarded and its marker cleared
//! - A factory reset is durable

#[cfg(test)]
mod tests {
    use std::path::Path;

    use commissioning_gate::{
        CallerContext, CommissioningApi, CommissioningError, CommissioningGate, FileBackedKVStore,
        GateConfig, KVStoreError, KeyValueStore, OperationalCertStatus, TokioClock,
        FAIL_SAFE_MARKER_KEY,
    };
    use tempfile::TempDir;

    use crate::integration::fixtures::{spawn_over, ServiceTask};
    use crate::TestCommissioner;

    fn open(path: &Path) -> FileBackedKVStore {
        FileBackedKVStore::open(path).expect("store should open")
    }

    fn reboot(path: &Path) -> CommissioningGate<FileBackedKVStore, TokioClock> {
        CommissioningGate::boot(GateConfig::for_testing(), open(path), TokioClock::new())
            .expect("gate should boot")
    }

    async fn shut_down(commissioner: TestCommissioner, task: ServiceTask<FileBackedKVStore>) {
        drop(commissioner);
        task.await.expect("service task should finish");
    }

    #[tokio::test]
    async fn test_committed_state_survives_reboot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gate.db");

        let (handle, task) = spawn_over(GateConfig::for_testing(), open(&path));
        let mut commissioner = TestCommissioner::new(handle).with_tc_response(3, 0x00FF);
        let report = commissioner.commission().await.unwrap();
        assert_eq!(report.complete_result, Some(CommissioningError::Ok));
        shut_down(commissioner, task).await;

        let gate = reboot(&path);
        let tc = gate.tc_attributes();
        assert_eq!((tc.accepted_version, tc.acknowledgements), (3, 0x00FF));
        let fabrics = gate.fabrics(&report.case_caller());
        assert_eq!(fabrics.len(), 1);
        assert_eq!(fabrics[0].fabric_index, report.fabric_index);
        assert!(!gate.fail_safe_state().armed);
    }

    #[tokio::test]
    async fn test_interrupted_attempt_is_discarded_on_boot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gate.db");

        let (handle, task) = spawn_over(GateConfig::for_testing(), open(&path));
        let mut commissioner = TestCommissioner::new(handle);
        commissioner.set_skip_commissioning_complete(true).await.unwrap();
        let report = commissioner.commission().await.unwrap();
        assert_eq!(report.tc_result, Some(CommissioningError::Ok));
        assert_eq!(report.complete_result, None);
        shut_down(commissioner, task).await;

        assert!(open(&path).get(FAIL_SAFE_MARKER_KEY).unwrap().is_some());

        let gate = reboot(&path);
        assert!(!gate.fail_safe_state().armed);
        assert!(gate.fabric_table().is_empty());
        assert!(gate.store().get(FAIL_SAFE_MARKER_KEY).unwrap().is_none());
        assert_eq!(gate.tc_attributes().accepted_version, 1);
        drop(gate);

        assert!(open(&path).get(FAIL_SAFE_MARKER_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fabric_removal_is_durable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gate.db");

        let (handle, task) = spawn_over(GateConfig::for_testing(), open(&path));
        let mut commissioner = TestCommissioner::new(handle);
        let first = commissioner.commission().await.unwrap();
        let second = commissioner.commission().await.unwrap();
        assert_eq!(
            commissioner
                .remove_fabric(&second.case_caller(), first.fabric_index)
                .await
                .unwrap(),
            OperationalCertStatus::Ok
        );
        shut_down(commissioner, task).await;

        let gate = reboot(&path);
        let fabrics = gate.fabrics(&second.case_caller());
        assert_eq!(fabrics.len(), 1);
        assert_eq!(fabrics[0].fabric_index, second.fabric_index);
    }

    #[tokio::test]
    async fn test_factory_reset_is_durable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gate.db");

        let (handle, task) = spawn_over(GateConfig::for_testing(), open(&path));
        let mut commissioner = TestCommissioner::new(handle);
        commissioner.commission().await.unwrap();
        commissioner.handle().factory_reset().await.unwrap();
        shut_down(commissioner, task).await;

        let gate = reboot(&path);
        assert_eq!(gate.tc_attributes().accepted_version, 0);
        assert_eq!(gate.tc_attributes().acknowledgements, 0);
        assert!(gate.fabrics(&CallerContext::pase()).is_empty());
    }

    #[test]
    fn test_corrupt_store_refuses_to_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gate.db");
        std::fs::write(&path, b"\xFF\xFF\xFF\xFF not a store").unwrap();

        assert!(matches!(
            FileBackedKVStore::open(&path),
            Err(KVStoreError::CorruptionError { .. })
        ));
    }
}
