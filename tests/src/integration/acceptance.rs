//! # TC Acceptance Flows
//!
//! The reference acceptance scenario and the completion gate, exercised
//! through `GateHandle` exactly as a remote commissioner would reach them.
//!
//! ## Flow Tested:
//!
//! 1. **SetTCAcknowledgements validation**: min-version check before the
//!    empty-response check, rejected writes leave the attributes untouched
//! 2. **Fail-safe independence**: arming and disarming never touch TC
//! 3. **Completion gate**: `CommissioningComplete` refuses until TC is met,
//!    then succeeds inside the same fail-safe window

#[cfg(test)]
mod tests {
    use commissioning_gate::{
        AttributeId, AttributeValue, CallerContext, CommissioningApi, CommissioningError,
        GateConfig, GatePhase, ReadResult,
    };

    use crate::integration::fixtures::{commissioner, spawn_gate};
    use crate::TestCommissioner;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    async fn read_u16(commissioner: &TestCommissioner, attribute: AttributeId) -> u16 {
        match commissioner
            .handle()
            .read(CallerContext::pase(), attribute)
            .await
            .unwrap()
        {
            ReadResult::Value(AttributeValue::U16(value)) => value,
            other => panic!("unexpected read of {attribute:?}: {other:?}"),
        }
    }

    async fn read_tc(commissioner: &TestCommissioner) -> (u16, u16) {
        (
            read_u16(commissioner, AttributeId::TCAcceptedVersion).await,
            read_u16(commissioner, AttributeId::TCAcknowledgements).await,
        )
    }

    /// SetTC(V0+1) → rejected writes → arm → SetTC(V0+2) → disarm.
    async fn run_reference_scenario(commissioner: &TestCommissioner, v0: u16) {
        let pase = CallerContext::pase();
        assert_eq!(read_tc(commissioner).await.0, v0);

        assert_eq!(
            commissioner.set_tc_acknowledgements(v0 + 1, 0xFFFF).await.unwrap(),
            CommissioningError::Ok
        );
        assert_eq!(read_tc(commissioner).await, (v0 + 1, 0xFFFF));

        assert_eq!(
            commissioner.set_tc_acknowledgements(0, 0).await.unwrap(),
            CommissioningError::TCMinVersionNotMet
        );
        assert_eq!(read_tc(commissioner).await, (v0 + 1, 0xFFFF));

        assert_eq!(
            commissioner.set_tc_acknowledgements(1, 0).await.unwrap(),
            CommissioningError::RequiredTCNotAccepted
        );
        assert_eq!(read_tc(commissioner).await, (v0 + 1, 0xFFFF));

        assert_eq!(commissioner.arm(&pase, 60).await.unwrap(), CommissioningError::Ok);
        assert_eq!(
            commissioner.set_tc_acknowledgements(v0 + 2, 0xFFFF).await.unwrap(),
            CommissioningError::Ok
        );
        assert_eq!(commissioner.arm(&pase, 0).await.unwrap(), CommissioningError::Ok);

        assert_eq!(read_tc(commissioner).await, (v0 + 2, 0xFFFF));
        assert!(!commissioner.handle().snapshot().fail_safe.armed);
    }

    // =============================================================================
    // REFERENCE SCENARIO
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_reference_scenario_from_fresh_device() {
        let (commissioner, _task) = commissioner(GateConfig::for_testing());
        run_reference_scenario(&commissioner, 0).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reference_scenario_from_prior_acceptance() {
        let (commissioner, _task) = commissioner(GateConfig::for_testing());
        commissioner.set_tc_acknowledgements(4, 0x0001).await.unwrap();
        run_reference_scenario(&commissioner, 4).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_required_attributes_are_readable() {
        let (commissioner, _task) = commissioner(GateConfig::for_testing());
        assert_eq!(read_u16(&commissioner, AttributeId::TCMinRequiredVersion).await, 1);
        let required = commissioner
            .handle()
            .read(CallerContext::pase(), AttributeId::TCAcknowledgementsRequired)
            .await
            .unwrap();
        assert_eq!(required, ReadResult::Value(AttributeValue::Bool(true)));
    }

    // =============================================================================
    // COMPLETION GATE
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_complete_waits_for_tc_within_same_window() {
        let (mut commissioner, _task) = commissioner(GateConfig::for_testing());
        commissioner.set_tc_required(false).await.unwrap();
        commissioner.set_skip_commissioning_complete(true).await.unwrap();

        let report = commissioner.commission().await.unwrap();
        let case = report.case_caller();
        assert_eq!(report.tc_result, None);

        assert_eq!(
            commissioner.complete(&case).await.unwrap(),
            CommissioningError::TCAcknowledgementsNotReceived
        );
        assert_eq!(commissioner.handle().snapshot().phase, GatePhase::Armed);

        assert_eq!(
            commissioner.set_tc_acknowledgements(1, 0x0001).await.unwrap(),
            CommissioningError::Ok
        );
        assert_eq!(commissioner.complete(&case).await.unwrap(), CommissioningError::Ok);
        assert_eq!(commissioner.handle().snapshot().phase, GatePhase::Committed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_relaxing_override_cannot_skip_device_enforcement() {
        let (mut commissioner, _task) = commissioner(GateConfig::for_testing());
        commissioner.set_tc_required(false).await.unwrap();

        let report = commissioner.commission().await.unwrap();
        assert_eq!(report.tc_result, None);
        assert_eq!(
            report.complete_result,
            Some(CommissioningError::TCAcknowledgementsNotReceived)
        );
        assert_eq!(commissioner.handle().tc_attributes().accepted_version, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_harness_flow_commits() {
        let (mut commissioner, _task) = commissioner(GateConfig::for_testing());
        let report = commissioner.commission().await.unwrap();
        assert_eq!(report.tc_result, Some(CommissioningError::Ok));
        assert_eq!(report.complete_result, Some(CommissioningError::Ok));

        let fabrics = match commissioner
            .handle()
            .read(report.case_caller(), AttributeId::Fabrics)
            .await
            .unwrap()
        {
            ReadResult::Value(AttributeValue::Fabrics(fabrics)) => fabrics,
            other => panic!("unexpected fabrics read: {other:?}"),
        };
        assert_eq!(fabrics.len(), 1);
        assert!(fabrics[0].is_caller_fabric);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_restores_default_flow() {
        let (mut commissioner, _task) = commissioner(GateConfig::for_testing());
        commissioner.set_tc_required(false).await.unwrap();
        commissioner.set_skip_commissioning_complete(true).await.unwrap();
        commissioner.reset().await.unwrap();

        let report = commissioner.commission().await.unwrap();
        assert_eq!(report.tc_result, Some(CommissioningError::Ok));
        assert_eq!(report.complete_result, Some(CommissioningError::Ok));
    }

    #[tokio::test(start_paused = true)]
    async fn test_optional_device_accepts_empty_response() {
        let mut config = GateConfig::for_testing();
        config.terms.acknowledgements_required = false;
        let (handle, _task) = spawn_gate(config);
        let commissioner = TestCommissioner::new(handle);

        assert_eq!(
            commissioner.set_tc_acknowledgements(0, 0).await.unwrap(),
            CommissioningError::Ok
        );
        assert_eq!(read_tc(&commissioner).await, (0, 0));
    }
}
