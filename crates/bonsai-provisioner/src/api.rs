use std::future::Future;
use std::pin::Pin;

use bonsai_core::models::{
    Cluster, ClusterCreateOpts, ClusterCreated, ClusterMessage, ClusterUpdateOpts,
};

use crate::error::ApiError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The control-plane client, addressed by cluster slug.
///
/// The provisioner treats this as a black box: transport, auth and wire
/// format all live behind it. Implementations must report a missing
/// cluster as [`ApiError::NotFound`] and rejected references as
/// [`ApiError::Validation`]; convergence detection depends on both.
///
/// Methods return boxed futures for dyn compatibility.
pub trait ClusterApi: Send + Sync {
    /// Request a new cluster. The response holds the one-time credentials.
    fn create(&self, opts: ClusterCreateOpts) -> BoxFuture<'_, Result<ClusterCreated, ApiError>>;

    /// Request a change of the mutable fields.
    fn update<'a>(
        &'a self,
        slug: &'a str,
        opts: ClusterUpdateOpts,
    ) -> BoxFuture<'a, Result<ClusterMessage, ApiError>>;

    /// Request deprovisioning.
    fn destroy<'a>(&'a self, slug: &'a str) -> BoxFuture<'a, Result<ClusterMessage, ApiError>>;

    /// Read the current state of one cluster.
    fn get_by_slug<'a>(&'a self, slug: &'a str) -> BoxFuture<'a, Result<Cluster, ApiError>>;
}

impl<T: ClusterApi + ?Sized> ClusterApi for std::sync::Arc<T> {
    fn create(&self, opts: ClusterCreateOpts) -> BoxFuture<'_, Result<ClusterCreated, ApiError>> {
        (**self).create(opts)
    }

    fn update<'a>(
        &'a self,
        slug: &'a str,
        opts: ClusterUpdateOpts,
    ) -> BoxFuture<'a, Result<ClusterMessage, ApiError>> {
        (**self).update(slug, opts)
    }

    fn destroy<'a>(&'a self, slug: &'a str) -> BoxFuture<'a, Result<ClusterMessage, ApiError>> {
        (**self).destroy(slug)
    }

    fn get_by_slug<'a>(&'a self, slug: &'a str) -> BoxFuture<'a, Result<Cluster, ApiError>> {
        (**self).get_by_slug(slug)
    }
}
