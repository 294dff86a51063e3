mod common;

use bonsai_core::models::{ClusterDescriptor, ClusterState, OperationKind};
use bonsai_provisioner::error::ApiError;
use bonsai_provisioner::predicate::{
    classify, AcceptanceMarker, Convergence, ConvergencePredicate, CreateConvergence,
    DeleteConvergence, UnavailableMarkers, UpdateConvergence,
};
use common::cluster;

fn remote_error() -> ApiError {
    ApiError::Remote {
        status: 500,
        message: "internal error".into(),
    }
}

#[test]
fn create_treats_not_found_as_in_progress() {
    let predicate = CreateConvergence::default();
    assert_eq!(predicate.classify(&Err(ApiError::NotFound)), Convergence::InProgress);
}

#[test]
fn create_fails_on_other_errors() {
    let predicate = CreateConvergence::default();
    let verdict = predicate.classify(&Err(remote_error()));
    assert!(matches!(verdict, Convergence::Failed(reason) if reason.contains("internal error")));
}

#[test]
fn create_waits_for_space_placement() {
    let predicate = CreateConvergence::default();

    let mut c = cluster("acct-search", ClusterState::Provisioned);
    c.space.path = "Not Available".into();
    assert_eq!(predicate.classify(&Ok(c)), Convergence::InProgress);

    let mut c = cluster("acct-search", ClusterState::Provisioned);
    c.space.uri = "space uri not available".into();
    assert_eq!(predicate.classify(&Ok(c)), Convergence::InProgress);
}

#[test]
fn create_waits_while_provisioning() {
    let predicate = CreateConvergence::default();
    let c = cluster("acct-search", ClusterState::Provisioning);
    assert_eq!(predicate.classify(&Ok(c)), Convergence::InProgress);
}

#[test]
fn create_ready_once_placed_and_provisioned() {
    let predicate = CreateConvergence::default();
    let c = cluster("acct-search", ClusterState::Provisioned);
    assert_eq!(predicate.classify(&Ok(c)), Convergence::Ready);
}

#[test]
fn swapped_markers_change_detection() {
    let predicate = CreateConvergence::new(UnavailableMarkers::new(["pending placement"]));

    let mut c = cluster("acct-search", ClusterState::Provisioned);
    c.space.path = "not available".into();
    assert_eq!(predicate.classify(&Ok(c.clone())), Convergence::Ready);

    c.space.path = "Pending Placement".into();
    assert_eq!(predicate.classify(&Ok(c)), Convergence::InProgress);
}

#[test]
fn update_needs_plan_settled_and_name_landed() {
    let predicate = UpdateConvergence::new("renamed", UnavailableMarkers::default());

    let plan_pending = cluster("renamed", ClusterState::UpdatingPlan);
    assert_eq!(predicate.classify(&Ok(plan_pending)), Convergence::InProgress);

    let name_pending = cluster("acct-search", ClusterState::Provisioned);
    assert_eq!(predicate.classify(&Ok(name_pending)), Convergence::InProgress);

    let done = cluster("renamed", ClusterState::Provisioned);
    assert_eq!(predicate.classify(&Ok(done)), Convergence::Ready);
}

#[test]
fn update_treats_not_found_as_in_progress() {
    let predicate = UpdateConvergence::new("renamed", UnavailableMarkers::default());
    assert_eq!(predicate.classify(&Err(ApiError::NotFound)), Convergence::InProgress);
    assert!(matches!(
        predicate.classify(&Err(remote_error())),
        Convergence::Failed(_)
    ));
}

#[test]
fn delete_terminal_on_not_found_or_deprovisioned() {
    let predicate = DeleteConvergence;
    assert_eq!(predicate.classify(&Err(ApiError::NotFound)), Convergence::NotFound);
    assert!(Convergence::NotFound.is_terminal());

    let gone = cluster("acct-search", ClusterState::Deprovisioned);
    assert_eq!(predicate.classify(&Ok(gone)), Convergence::Ready);

    let going = cluster("acct-search", ClusterState::Deprovisioning);
    assert_eq!(predicate.classify(&Ok(going)), Convergence::InProgress);
    assert!(!Convergence::InProgress.is_terminal());
}

#[test]
fn delete_fails_on_other_errors() {
    let verdict = DeleteConvergence.classify(&Err(ApiError::Transport("reset".into())));
    assert!(matches!(verdict, Convergence::Failed(reason) if reason.contains("reset")));
}

#[test]
fn acceptance_marker_matches_acknowledgement_phrase() {
    let marker = AcceptanceMarker::default();
    assert!(marker.accepts("Your cluster is being updated. This may take a few minutes."));
    assert!(!marker.accepts("Nothing to update"));
    assert!(!marker.accepts(""));
}

#[test]
fn classify_dispatches_on_operation_kind() {
    let desired = ClusterDescriptor::new("acct-search");
    let not_found = Err(ApiError::NotFound);

    assert_eq!(
        classify(OperationKind::Create, &desired, &not_found),
        Convergence::InProgress
    );
    assert_eq!(
        classify(OperationKind::Update, &desired, &not_found),
        Convergence::InProgress
    );
    assert_eq!(
        classify(OperationKind::Delete, &desired, &not_found),
        Convergence::NotFound
    );
    assert_eq!(
        classify(
            OperationKind::Update,
            &desired,
            &Ok(cluster("acct-search", ClusterState::Provisioned))
        ),
        Convergence::Ready
    );
}
