#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bonsai_core::models::{
    Cluster, ClusterAccess, ClusterCreateOpts, ClusterCreated, ClusterMessage, ClusterState,
    ClusterUpdateOpts, PlanRef, ReleaseRef, SpaceRef,
};
use bonsai_provisioner::api::{BoxFuture, ClusterApi};
use bonsai_provisioner::cancel::CancelHandle;
use bonsai_provisioner::clock::Clock;
use bonsai_provisioner::error::ApiError;

pub const SLUG: &str = "acct-search-4821";
pub const USER: &str = "k3y7user";
pub const PASSWORD: &str = "s3cretpass";

/// Clock whose sleeps advance virtual time instantly.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.sleeps.lock().unwrap().push(duration);
            self.advance(duration);
        })
    }
}

/// Scripted answer to a read.
#[derive(Debug, Clone)]
pub enum Reply {
    Found(Cluster),
    NotFound,
    Invalid(String),
    Remote(u16, String),
}

impl Reply {
    fn into_result<T>(self, found: impl FnOnce(Cluster) -> T) -> Result<T, ApiError> {
        match self {
            Reply::Found(cluster) => Ok(found(cluster)),
            Reply::NotFound => Err(ApiError::NotFound),
            Reply::Invalid(message) => Err(ApiError::Validation { message }),
            Reply::Remote(status, message) => Err(ApiError::Remote { status, message }),
        }
    }
}

#[derive(Debug, Clone)]
enum MutationReply<T> {
    Ok(T),
    Err(Reply),
}

/// In-memory control plane driven by a script of replies.
#[derive(Debug)]
pub struct FakeApi {
    create_reply: Mutex<MutationReply<ClusterCreated>>,
    update_reply: Mutex<MutationReply<ClusterMessage>>,
    destroy_reply: Mutex<MutationReply<ClusterMessage>>,
    reads: Mutex<VecDeque<Reply>>,
    /// Answer once the queue is drained.
    steady: Mutex<Reply>,
    cancel_after: Mutex<Option<(usize, CancelHandle)>>,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub destroy_calls: AtomicUsize,
    pub read_calls: AtomicUsize,
    pub last_create: Mutex<Option<ClusterCreateOpts>>,
    pub last_update: Mutex<Option<ClusterUpdateOpts>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            create_reply: Mutex::new(MutationReply::Ok(created())),
            update_reply: Mutex::new(MutationReply::Ok(ClusterMessage {
                message: "Your cluster is being updated.".into(),
            })),
            destroy_reply: Mutex::new(MutationReply::Ok(ClusterMessage {
                message: "Your cluster is being deprovisioned.".into(),
            })),
            reads: Mutex::new(VecDeque::new()),
            steady: Mutex::new(Reply::NotFound),
            cancel_after: Mutex::new(None),
            create_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            destroy_calls: AtomicUsize::new(0),
            read_calls: AtomicUsize::new(0),
            last_create: Mutex::new(None),
            last_update: Mutex::new(None),
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn create_fails(self, reply: Reply) -> Self {
        *self.create_reply.lock().unwrap() = MutationReply::Err(reply);
        self
    }

    pub fn create_returns(self, created: ClusterCreated) -> Self {
        *self.create_reply.lock().unwrap() = MutationReply::Ok(created);
        self
    }

    pub fn update_message(self, message: &str) -> Self {
        *self.update_reply.lock().unwrap() = MutationReply::Ok(ClusterMessage {
            message: message.into(),
        });
        self
    }

    pub fn update_fails(self, reply: Reply) -> Self {
        *self.update_reply.lock().unwrap() = MutationReply::Err(reply);
        self
    }

    pub fn destroy_fails(self, reply: Reply) -> Self {
        *self.destroy_reply.lock().unwrap() = MutationReply::Err(reply);
        self
    }

    pub fn reads(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.reads.lock().unwrap().extend(replies);
        self
    }

    pub fn then_always(self, reply: Reply) -> Self {
        *self.steady.lock().unwrap() = reply;
        self
    }

    /// Fire `handle` once `reads` fetches have been answered.
    pub fn cancel_after_reads(self, reads: usize, handle: CancelHandle) -> Self {
        *self.cancel_after.lock().unwrap() = Some((reads, handle));
        self
    }

    /// Replace the remaining script, e.g. between two operations.
    pub fn script(&self, replies: impl IntoIterator<Item = Reply>, steady: Reply) {
        let mut reads = self.reads.lock().unwrap();
        reads.clear();
        reads.extend(replies);
        *self.steady.lock().unwrap() = steady;
    }

    pub fn reads_made(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn updates_made(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn creates_made(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn destroys_made(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    fn next_read(&self) -> Reply {
        let reply = self
            .reads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.steady.lock().unwrap().clone());
        let made = self.read_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, handle)) = self.cancel_after.lock().unwrap().as_ref() {
            if made >= *after {
                handle.cancel();
            }
        }
        reply
    }
}

fn mutation<T: Clone>(reply: &Mutex<MutationReply<T>>) -> Result<T, ApiError> {
    match reply.lock().unwrap().clone() {
        MutationReply::Ok(value) => Ok(value),
        MutationReply::Err(reply) => reply.into_result(|_| unreachable!("error replies only")),
    }
}

impl ClusterApi for FakeApi {
    fn create(&self, opts: ClusterCreateOpts) -> BoxFuture<'_, Result<ClusterCreated, ApiError>> {
        Box::pin(async move {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_create.lock().unwrap() = Some(opts);
            mutation(&self.create_reply)
        })
    }

    fn update<'a>(
        &'a self,
        _slug: &'a str,
        opts: ClusterUpdateOpts,
    ) -> BoxFuture<'a, Result<ClusterMessage, ApiError>> {
        Box::pin(async move {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_update.lock().unwrap() = Some(opts);
            mutation(&self.update_reply)
        })
    }

    fn destroy<'a>(&'a self, _slug: &'a str) -> BoxFuture<'a, Result<ClusterMessage, ApiError>> {
        Box::pin(async move {
            self.destroy_calls.fetch_add(1, Ordering::SeqCst);
            mutation(&self.destroy_reply)
        })
    }

    fn get_by_slug<'a>(&'a self, _slug: &'a str) -> BoxFuture<'a, Result<Cluster, ApiError>> {
        Box::pin(async move { self.next_read().into_result(|cluster| cluster) })
    }
}

pub fn created() -> ClusterCreated {
    ClusterCreated {
        message: "Your cluster is being provisioned.".into(),
        monitor: format!("https://api.bonsai.test/clusters/{SLUG}"),
        access: ClusterAccess {
            host: SLUG.into(),
            port: 443,
            scheme: "https".into(),
            user: Some(USER.into()),
            password: Some(PASSWORD.into()),
            url: None,
        },
    }
}

/// A fully provisioned cluster as a read returns it: no credentials.
pub fn cluster(name: &str, state: ClusterState) -> Cluster {
    Cluster {
        slug: SLUG.into(),
        name: name.into(),
        uri: format!("https://api.bonsai.test/clusters/{SLUG}"),
        plan: PlanRef {
            slug: "sandbox".into(),
            uri: "https://api.bonsai.test/plans/sandbox".into(),
        },
        release: ReleaseRef {
            service_type: "opensearch".into(),
            package_name: "opensearch".into(),
            version: "2.6.0".into(),
            slug: "opensearch-2.6.0-mt".into(),
            uri: "https://api.bonsai.test/releases/opensearch-2.6.0-mt".into(),
        },
        space: SpaceRef {
            path: "omc/bonsai/us-east-1/common".into(),
            region: "aws-us-east-1".into(),
            uri: "https://api.bonsai.test/spaces/omc/bonsai/us-east-1/common".into(),
        },
        stats: Default::default(),
        access: ClusterAccess {
            host: format!("{SLUG}.us-east-1.bonsaisearch.net"),
            port: 443,
            scheme: "https".into(),
            user: None,
            password: None,
            url: None,
        },
        state: Some(state),
    }
}

pub fn ready(name: &str) -> Reply {
    Reply::Found(cluster(name, ClusterState::Provisioned))
}

/// Readable, but placement hasn't resolved yet.
pub fn placing(name: &str) -> Reply {
    let mut c = cluster(name, ClusterState::Provisioning);
    c.space.path = "Space is not available yet".into();
    c.space.uri = "not available".into();
    Reply::Found(c)
}
