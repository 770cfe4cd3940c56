//! # Funding Flows
//!
//! Create → donate → read back → deactivate, through the public API only.

#[cfg(test)]
mod tests {
    use cf_funding_engine::{
        invariant_completion_consistent, invariant_raised_is_sum, FundingApi, FundingError,
        LifecycleError, LifecycleState, MilestoneDraft, ValidationError,
    };
    use futures::TryStreamExt;

    use crate::integration::fixtures::*;

    // =============================================================================
    // MILESTONE SCENARIO
    // =============================================================================

    #[tokio::test]
    async fn test_goal_100_two_milestones_scenario() {
        let w = world().await;
        let id = wells(&w.engine).await;

        // 40 to milestone 0 completes it.
        w.engine.donate(id, 0, ALICE, amt(40)).await.unwrap();
        let project = w.engine.get_project(id).await.unwrap();
        assert!(project.milestones[0].is_completed());
        assert_eq!(project.raised_amount, amt(40));

        // 61 to milestone 1 is over the cap; the headroom is reported.
        let err = w.engine.donate(id, 1, BOB, amt(61)).await.unwrap_err();
        assert_eq!(
            err,
            FundingError::InvalidInput(ValidationError::MilestoneCapExceeded { headroom: amt(60) })
        );

        // The exact headroom is accepted.
        w.engine.donate(id, 1, BOB, amt(60)).await.unwrap();
        let project = w.engine.get_project(id).await.unwrap();
        assert_eq!(project.raised_amount, amt(100));
        assert!(project.all_milestones_completed());
        assert!(invariant_raised_is_sum(&project));
        assert!(invariant_completion_consistent(&project));
    }

    #[tokio::test]
    async fn test_full_catalog_read_holds_invariants() {
        let w = world().await;
        let a = wells(&w.engine).await;
        let b = wells(&w.engine).await;
        w.engine.donate(a, 0, ALICE, amt(10)).await.unwrap();
        w.engine.donate(b, 1, ALICE, amt(60)).await.unwrap();
        w.engine.donate(b, 0, BOB, amt(39)).await.unwrap();

        let projects: Vec<_> = w.engine.catalog().list().try_collect().await.unwrap();
        assert_eq!(projects.len(), 2);
        for project in &projects {
            assert!(invariant_raised_is_sum(project));
            assert!(invariant_completion_consistent(project));
        }
        assert_eq!(projects[1].raised_amount, amt(99));
    }

    #[tokio::test]
    async fn test_under_allocated_project_keeps_headroom() {
        let w = world().await;
        let receipt = w
            .engine
            .create_project(
                CHARITY,
                "Shelter",
                amt(1000),
                vec![MilestoneDraft::new("Roof", 300u64)],
            )
            .await
            .unwrap();
        let project = w.engine.get_project(receipt.project_id.unwrap()).await.unwrap();
        assert_eq!(project.unallocated(), amt(700));
        assert_eq!(project.remaining_to_goal(), amt(1000));
    }

    // =============================================================================
    // CONTRIBUTIONS
    // =============================================================================

    #[tokio::test]
    async fn test_contributions_per_donor() {
        let w = world().await;
        let id = wells(&w.engine).await;
        w.engine.donate(id, 0, ALICE, amt(15)).await.unwrap();
        w.engine.donate(id, 1, ALICE, amt(5)).await.unwrap();
        w.engine.donate(id, 1, BOB, amt(9)).await.unwrap();

        let alice = w.engine.contributions(ALICE, id).await.unwrap();
        assert_eq!(alice.per_milestone, vec![amt(15), amt(5)]);
        assert_eq!(alice.total, amt(20));
        assert!(alice.is_consistent());

        let nobody = w.engine.contributions(CHARITY, id).await.unwrap();
        assert_eq!(nobody.per_milestone, vec![amt(0), amt(0)]);
        assert_eq!(nobody.total, amt(0));

        let positions = w.engine.donated_projects(BOB).await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].donated, amt(9));
    }

    // =============================================================================
    // LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_deactivation_is_one_way_and_owner_only() {
        let w = world().await;
        let id = wells(&w.engine).await;

        assert!(matches!(
            w.engine.deactivate(id, ALICE).await,
            Err(FundingError::Lifecycle(LifecycleError::Unauthorized { .. }))
        ));

        w.engine.deactivate(id, CHARITY).await.unwrap();
        let after_first = w.engine.get_project(id).await.unwrap();
        assert_eq!(after_first.lifecycle_state(), LifecycleState::Deactivated);

        assert_eq!(
            w.engine.deactivate(id, CHARITY).await,
            Err(FundingError::Lifecycle(LifecycleError::AlreadyDeactivated))
        );
        assert_eq!(w.engine.get_project(id).await.unwrap(), after_first);

        assert_eq!(
            w.engine.donate(id, 0, ALICE, amt(1)).await,
            Err(FundingError::InvalidInput(ValidationError::ProjectInactive))
        );
    }

    #[tokio::test]
    async fn test_my_charity_view() {
        let w = world().await;
        wells(&w.engine).await;
        w.engine
            .create_project(ALICE, "Alice's", amt(5), vec![])
            .await
            .unwrap();

        let mine = w.engine.projects_owned_by(CHARITY).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "Clean water wells");
        assert_eq!(w.engine.projects_owned_by(ALICE).await.unwrap().len(), 1);
    }
}
