//! # Failure Modes
//!
//! Rate outages, ledger outages, confirmation timeouts, stale sessions and
//! corrupt records.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use cf_funding_engine::gateway::methods;
    use cf_funding_engine::{
        EngineConfig, FileSessionStore, FundingApi, FundingError, FundingService, InMemoryLedger,
        LedgerTransport, MockRateSource, Provisioner, SessionConfig, SessionStore,
    };
    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::integration::fixtures::*;

    // =============================================================================
    // EXCHANGE RATE
    // =============================================================================

    #[tokio::test]
    async fn test_rate_outage_serves_last_value() {
        let w = world().await;
        let id = wells(&w.engine).await;

        assert!(w.engine.rate().is_none());
        w.engine.refresh_rate().await.unwrap();

        w.rates.set_failing(true);
        assert!(w.engine.refresh_rate().await.is_err());
        assert_eq!(w.engine.rate().unwrap().rate, Decimal::from(2500));

        // Funding logic is untouched by the outage.
        w.engine.donate(id, 0, ALICE, amt(40)).await.unwrap();
        assert!(w.engine.get_project(id).await.unwrap().milestones[0].is_completed());
    }

    #[tokio::test]
    async fn test_never_fetched_rate_means_native_only() {
        let w = world().await;
        let id = wells(&w.engine).await;
        w.rates.set_failing(true);
        assert!(w.engine.refresh_rate().await.is_err());

        assert!(w.engine.rate().is_none());
        assert!(w.engine.to_display(amt(1)).is_none());
        assert_eq!(
            w.engine.donate_display(id, 0, ALICE, Decimal::ONE).await,
            Err(FundingError::RateUnavailable)
        );
        w.engine.donate(id, 1, ALICE, amt(60)).await.unwrap();
    }

    // =============================================================================
    // LEDGER OUTAGES AND TIMEOUTS
    // =============================================================================

    #[tokio::test]
    async fn test_reads_ride_out_short_outage() {
        let config = EngineConfig {
            read_retries: 2,
            ..EngineConfig::for_testing()
        };
        let w = world_with(config).await;
        let id = wells(&w.engine).await;

        w.ledger.fail_next_calls(2);
        assert!(w.engine.get_project(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_submit_outage_is_not_retried() {
        let w = world().await;
        let id = wells(&w.engine).await;
        let block = w.ledger.block_number();

        w.ledger.fail_next_submits(1);
        let err = w.engine.donate(id, 0, ALICE, amt(10)).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(w.ledger.block_number(), block);
        assert_eq!(w.engine.get_project(id).await.unwrap().raised_amount, amt(0));
    }

    #[tokio::test]
    async fn test_timeout_is_ambiguous_and_requires_reread() {
        let w = world().await;
        let id = wells(&w.engine).await;

        // for_testing() bounds the wait at one second.
        w.ledger.set_confirmation_delay(Duration::from_secs(3));
        let err = w.engine.donate(id, 0, ALICE, amt(10)).await.unwrap_err();
        assert!(matches!(err, FundingError::Timeout { .. }));
        assert!(err.requires_reread());

        // The write left local control and landed anyway.
        let project = w.engine.get_project(id).await.unwrap();
        assert_eq!(project.raised_amount, amt(10));
    }

    // =============================================================================
    // SESSION
    // =============================================================================

    #[tokio::test]
    async fn test_stale_session_surfaces_stale_configuration() {
        let ledger = Arc::new(InMemoryLedger::new());
        let session = SessionConfig::new(
            "0x00000000000000000000000000000000000000ff",
            CHARITY.to_string(),
        );
        let engine = FundingService::new(
            ledger,
            Arc::new(MockRateSource::default()),
            session,
            &EngineConfig::for_testing(),
        );
        assert!(matches!(
            engine.list_projects().await,
            Err(FundingError::StaleConfiguration(_))
        ));
        assert!(matches!(
            engine.donate(0, 0, ALICE, amt(1)).await,
            Err(FundingError::StaleConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_file_session_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let ledger = Arc::new(InMemoryLedger::new());

        let first = Provisioner::new(ledger.clone(), Arc::new(FileSessionStore::new(&path)))
            .ensure_session(CHARITY)
            .await
            .unwrap();

        // A new process with the same file reuses the contract.
        let second = Provisioner::new(ledger.clone(), Arc::new(FileSessionStore::new(&path)))
            .ensure_session(ALICE)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(
            FileSessionStore::new(&path).load().unwrap().unwrap().signer().unwrap(),
            CHARITY
        );
    }

    // =============================================================================
    // CORRUPT RECORDS
    // =============================================================================

    #[tokio::test]
    async fn test_corrupt_record_excluded_others_listed() {
        let w = world().await;
        let good = wells(&w.engine).await;
        let bad = wells(&w.engine).await;
        let contract = w.engine.gateway().session().contract_address.clone();

        // Ledger aggregate larger than the milestones can account for.
        let mut record = w
            .ledger
            .call(&contract, methods::GET_PROJECT, vec![json!(bad)])
            .await
            .unwrap();
        record["raisedAmount"] = json!("500");
        w.ledger
            .inject_response(methods::GET_PROJECT, vec![json!(bad)], record);

        let snapshot = w.engine.list_projects().await.unwrap();
        assert_eq!(snapshot.projects.len(), 1);
        assert_eq!(snapshot.projects[0].id, good);
        assert_eq!(snapshot.corrupt.len(), 1);
        assert!(matches!(
            w.engine.get_project(bad).await,
            Err(FundingError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn test_ragged_bulk_read_fails_whole_listing() {
        let w = world().await;
        wells(&w.engine).await;
        w.ledger.inject_response(
            methods::GET_PROJECTS,
            vec![],
            json!({
                "id": [0, 1],
                "name": ["a"],
                "charityAddress": [],
                "goalAmount": [],
                "raisedAmount": [],
                "isActive": [],
                "milestoneCount": [],
            }),
        );
        assert!(matches!(
            w.engine.list_projects().await,
            Err(FundingError::Corrupt(_))
        ));
    }
}
