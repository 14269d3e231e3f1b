//! Asynchronous load requests and the messages exchanged with the loader thread.

use smallvec::SmallVec;

use crate::errors::*;

use super::asset::{AssetObject, TypeTag};
use super::asset_ref::RefTarget;
use super::header::AssetHeader;
use super::location::AssetLocation;

/// Identifies an asynchronous load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(pub(crate) u64);

/// The stage of an asynchronous load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Submitted, but not picked up by the loader thread yet.
    Queued,
    /// Being deserialized on the loader thread.
    Loading,
    /// Deserialized, and waiting on the owning thread for its dependencies.
    AwaitingDependencies,
    /// Installed into its stub.
    Finalized,
}

pub(crate) type Loaded = (Box<dyn AssetObject>, AssetHeader);

pub(crate) struct LoadRequest {
    pub name: String,
    pub state: LoadState,
    pub targets: SmallVec<[RefTarget; 2]>,
    pub dependencies: SmallVec<[String; 4]>,
    pub object: Option<Result<Loaded>>,
    pub requeue_count: u32,
}

impl LoadRequest {
    pub fn new<T: Into<String>>(name: T) -> Self {
        LoadRequest {
            name: name.into(),
            state: LoadState::Queued,
            targets: SmallVec::new(),
            dependencies: SmallVec::new(),
            object: None,
            requeue_count: 0,
        }
    }
}

/// A load handed to the loader thread.
pub(crate) struct Job {
    pub ticket: LoadTicket,
    pub name: String,
    pub type_tag: TypeTag,
    pub location: AssetLocation,
}

/// A reference discovered while deserializing on the loader thread. It is
/// resolved on the owning thread.
pub(crate) struct PendingReference {
    pub name: String,
    pub target: RefTarget,
}

pub(crate) struct Completion {
    pub ticket: LoadTicket,
    pub result: Result<Loaded>,
    pub references: Vec<PendingReference>,
}

pub(crate) enum WorkerEvent {
    Started(LoadTicket),
    Finished(Completion),
}
