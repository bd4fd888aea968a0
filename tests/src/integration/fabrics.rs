//! # Fabric Teardown Flows
//!
//! A commissioner on one fabric removes every other fabric and then its own.
//! Each removal of a valid index answers `Ok`; the table ends empty and the
//! TC acceptance is left as it was.

#[cfg(test)]
mod tests {
    use commissioning_gate::{
        AttributeId, AttributeValue, CallerContext, CommissioningApi, CommissioningError,
        FabricDescriptor, GateConfig, OperationalCertStatus, ReadResult,
    };

    use crate::integration::fixtures::commissioner;
    use crate::{CommissioningReport, TestCommissioner};

    async fn fabrics(
        commissioner: &TestCommissioner,
        caller: CallerContext,
    ) -> Vec<FabricDescriptor> {
        match commissioner
            .handle()
            .read(caller, AttributeId::Fabrics)
            .await
            .unwrap()
        {
            ReadResult::Value(AttributeValue::Fabrics(fabrics)) => fabrics,
            other => panic!("unexpected fabrics read: {other:?}"),
        }
    }

    async fn commission_all(
        commissioner: &mut TestCommissioner,
        count: usize,
    ) -> Vec<CommissioningReport> {
        let mut reports = Vec::with_capacity(count);
        for _ in 0..count {
            let report = commissioner.commission().await.unwrap();
            assert_eq!(report.complete_result, Some(CommissioningError::Ok));
            reports.push(report);
        }
        reports
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_others_then_self_leaves_empty_table() {
        let (mut commissioner, _task) = commissioner(GateConfig::for_testing());
        let reports = commission_all(&mut commissioner, 3).await;
        let own = reports[2];
        let caller = own.case_caller();
        assert_eq!(fabrics(&commissioner, caller).await.len(), 3);

        for other in &reports[..2] {
            assert_eq!(
                commissioner.remove_fabric(&caller, other.fabric_index).await.unwrap(),
                OperationalCertStatus::Ok
            );
        }
        let remaining = fabrics(&commissioner, caller).await;
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].is_caller_fabric);

        assert_eq!(
            commissioner.remove_fabric(&caller, own.fabric_index).await.unwrap(),
            OperationalCertStatus::Ok
        );
        assert!(fabrics(&commissioner, caller).await.is_empty());

        let tc = commissioner.handle().tc_attributes();
        assert_eq!((tc.accepted_version, tc.acknowledgements), (1, 0xFFFF));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_unknown_index_is_invalid() {
        let (mut commissioner, _task) = commissioner(GateConfig::for_testing());
        let report = commission_all(&mut commissioner, 1).await.remove(0);
        let caller = report.case_caller();

        assert_eq!(
            commissioner.remove_fabric(&caller, 200).await.unwrap(),
            OperationalCertStatus::InvalidFabricIndex
        );
        commissioner
            .remove_fabric(&caller, report.fabric_index)
            .await
            .unwrap();
        assert_eq!(
            commissioner.remove_fabric(&caller, report.fabric_index).await.unwrap(),
            OperationalCertStatus::NOT_FOUND
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_fabric_is_not_removable() {
        let (mut commissioner, _task) = commissioner(GateConfig::for_testing());
        commissioner.set_skip_commissioning_complete(true).await.unwrap();
        let report = commissioner.commission().await.unwrap();

        assert_eq!(
            commissioner
                .remove_fabric(&report.case_caller(), report.fabric_index)
                .await
                .unwrap(),
            OperationalCertStatus::InvalidFabricIndex
        );
        assert_eq!(
            commissioner.complete(&report.case_caller()).await.unwrap(),
            CommissioningError::Ok
        );
        assert_eq!(fabrics(&commissioner, report.case_caller()).await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_indices_are_not_reused_after_teardown() {
        let (mut commissioner, _task) = commissioner(GateConfig::for_testing());
        let first = commission_all(&mut commissioner, 1).await.remove(0);
        commissioner
            .remove_fabric(&first.case_caller(), first.fabric_index)
            .await
            .unwrap();

        let second = commission_all(&mut commissioner, 1).await.remove(0);
        assert_ne!(second.fabric_index, first.fabric_index);
    }
}
