pub mod cluster;
pub mod descriptor;
pub mod snapshot;
pub mod state;

pub use cluster::{
    Cluster, ClusterAccess, ClusterCreateOpts, ClusterCreated, ClusterMessage, ClusterStats,
    ClusterUpdateOpts, PlanRef, ReleaseRef, SpaceRef,
};
pub use descriptor::ClusterDescriptor;
pub use snapshot::{ClusterSnapshot, Credentials};
pub use state::{ClusterState, OperationKind};
