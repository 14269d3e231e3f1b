//! The owning-thread half of the asynchronous load pipeline.
//!
//! `AsyncLoader` keeps every in-flight `LoadRequest`, hands jobs to the loader
//! thread and takes its completions back in. A completed request waits in a
//! FIFO until every asset it references has been installed in the registry,
//! and is then finalized and assigned into the handles waiting on it.

use std::collections::VecDeque;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use smallvec::SmallVec;

use crate::errors::*;
use crate::utils::FastHashMap;

use super::asset::Asset;
use super::asset_ref::{self, RefTarget};
use super::factory::TypeFactory;
use super::registry::Registry;
use super::request::{Completion, Job, LoadRequest, LoadState, LoadTicket, WorkerEvent};
use super::worker::Worker;

pub(crate) struct AsyncLoader {
    // Dropped before the worker, so the loader thread stops at its next event.
    events: Receiver<WorkerEvent>,
    worker: Worker,
    requests: FastHashMap<LoadTicket, LoadRequest>,
    names: FastHashMap<String, LoadTicket>,
    completed: VecDeque<LoadTicket>,
    next_ticket: u64,
    created: usize,
}

impl AsyncLoader {
    pub fn new(factory: Arc<TypeFactory>) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let worker = Worker::spawn(factory, tx)?;

        Ok(AsyncLoader {
            events: rx,
            worker,
            requests: FastHashMap::default(),
            names: FastHashMap::default(),
            completed: VecDeque::new(),
            next_ticket: 1,
            created: 0,
        })
    }

    /// Requests `name` to be loaded and assigned into `target`.
    ///
    /// If the asset is installed already, it is assigned right away. If a request
    /// of the same asset is in flight, `target` joins its targets. Otherwise a
    /// new request is created and handed to the loader thread.
    pub fn submit(
        &mut self,
        registry: &Registry,
        name: &str,
        target: Option<&RefTarget>,
    ) -> Result<()> {
        let stub = match registry.lookup(name) {
            Some(stub) => stub,
            None => {
                error!("Asset {} does not exist in the registry.", name);
                return Err(Error::NotFound(name.to_owned()));
            }
        };

        if let Some(target) = target {
            self.detach(target);
        }

        if let Some(asset) = stub.asset() {
            if let Some(target) = target {
                asset_ref::assign(target, asset);
            }

            return Ok(());
        }

        if let Some(&ticket) = self.names.get(name) {
            if let Some(target) = target {
                self.attach(ticket, target);
            }

            return Ok(());
        }

        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;

        self.worker.send(Job {
            ticket,
            name: name.to_owned(),
            type_tag: stub.type_tag(),
            location: stub.location().clone(),
        })?;

        self.created += 1;
        self.requests.insert(ticket, LoadRequest::new(name));
        self.names.insert(name.to_owned(), ticket);

        if let Some(target) = target {
            self.attach(ticket, target);
        }

        debug!("Queued asynchronous load of asset {}.", name);
        Ok(())
    }

    fn attach(&mut self, ticket: LoadTicket, target: &RefTarget) {
        if let Some(request) = self.requests.get_mut(&ticket) {
            asset_ref::bind(target, ticket);
            request.targets.push(target.clone());
        }
    }

    // Removes `target` from the request it is currently waiting on. The load
    // itself carries on for the other targets.
    fn detach(&mut self, target: &RefTarget) {
        if let Some(ticket) = asset_ref::binding(target) {
            if let Some(request) = self.requests.get_mut(&ticket) {
                request.targets.retain(|v| !v.ptr_eq(target));
            }
        }
    }

    /// Takes in everything the loader thread has reported so far, without
    /// blocking.
    pub fn poll(&mut self, registry: &Registry) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                WorkerEvent::Started(ticket) => {
                    if let Some(request) = self.requests.get_mut(&ticket) {
                        request.state = LoadState::Loading;
                    }
                }
                WorkerEvent::Finished(completion) => self.complete(registry, completion),
            }
        }
    }

    fn complete(&mut self, registry: &Registry, completion: Completion) {
        let Completion {
            ticket,
            result,
            references,
        } = completion;

        let name = match self.requests.get(&ticket) {
            Some(request) => request.name.clone(),
            None => return,
        };

        let mut dependencies: SmallVec<[String; 4]> = SmallVec::new();
        if result.is_ok() {
            for reference in references {
                match registry.lookup(&reference.name) {
                    Some(stub) if stub.is_loaded() => {
                        if let Some(asset) = stub.asset() {
                            asset_ref::assign(&reference.target, asset);
                        }
                    }
                    Some(_) => {
                        let target = Some(&reference.target);
                        if let Err(err) = self.submit(registry, &reference.name, target) {
                            warn!(
                                "Failed to load asset {} referenced by {}: {}",
                                reference.name, name, err
                            );
                            continue;
                        }

                        if reference.name != name && !dependencies.contains(&reference.name) {
                            dependencies.push(reference.name);
                        }
                    }
                    None => warn!(
                        "Asset {} referenced by {} does not exist in the registry.",
                        reference.name, name
                    ),
                }
            }
        }

        if let Some(request) = self.requests.get_mut(&ticket) {
            request.dependencies = dependencies;
            request.object = Some(result);
            request.state = LoadState::AwaitingDependencies;
        }

        self.completed.push_back(ticket);
    }

    /// Pops the oldest request that waits for finalization.
    #[inline]
    pub fn pop_completed(&mut self) -> Option<LoadTicket> {
        self.completed.pop_front()
    }

    /// Puts a request back at the end of the finalization queue.
    #[inline]
    pub fn requeue(&mut self, ticket: LoadTicket) {
        self.completed.push_back(ticket);
    }

    /// Returns true if every asset the request references is installed. Stubs
    /// that have been deregistered in the meantime do not hold it back.
    pub fn dependencies_ready(&self, ticket: LoadTicket, registry: &Registry) -> bool {
        self.requests.get(&ticket).map_or(true, |request| {
            request
                .dependencies
                .iter()
                .all(|v| registry.lookup(v).map_or(true, |stub| stub.is_loaded()))
        })
    }

    /// Increases and returns the requeue counter of a request.
    pub fn bump(&mut self, ticket: LoadTicket) -> u32 {
        match self.requests.get_mut(&ticket) {
            Some(request) => {
                request.requeue_count += 1;
                request.requeue_count
            }
            None => 0,
        }
    }

    pub fn request_name(&self, ticket: LoadTicket) -> Option<&str> {
        self.requests.get(&ticket).map(|v| v.name.as_str())
    }

    /// Finalizes a request on the owning thread: the object is created, installed
    /// into its stub and assigned into every handle that is still waiting for it.
    ///
    /// If the stub has been loaded by other means in the meantime, the installed
    /// object is handed out instead, and the freshly deserialized one is dropped.
    pub fn finish(&mut self, ticket: LoadTicket, registry: &mut Registry) {
        let mut request = match self.requests.remove(&ticket) {
            Some(request) => request,
            None => return,
        };

        if self.names.get(&request.name) == Some(&ticket) {
            self.names.remove(&request.name);
        }

        let stub = match registry.lookup_mut(&request.name) {
            Some(stub) => stub,
            None => {
                error!("Asset {} has been deregistered while loading.", request.name);
                abandon(&request, ticket);
                return;
            }
        };

        if let Some(asset) = stub.asset().cloned() {
            fan_out(&request, ticket, &asset);
            return;
        }

        match request.object.take() {
            Some(Ok((object, header))) => {
                if object.type_tag() != stub.type_tag() {
                    error!(
                        "Asset {} is registered as {}, but loaded as {}.",
                        request.name,
                        stub.type_tag(),
                        object.type_tag()
                    );

                    abandon(&request, ticket);
                    return;
                }

                let asset = Asset::new(request.name.clone(), object);
                asset.set_version(header.version);
                asset.set_embedded(header.embedded);
                asset.set_engine(stub.is_engine());
                asset.finalize();
                stub.set_asset(Some(asset.clone()));

                debug!("Finalized asset {}.", request.name);
                fan_out(&request, ticket, &asset);
            }
            Some(Err(err)) => {
                error!("Failed to load asset {}: {}", request.name, err);
                abandon(&request, ticket);
            }
            None => {
                error!("Asset {} was finalized before it had been loaded.", request.name);
                abandon(&request, ticket);
            }
        }
    }

    /// Moves the in-flight request of `name`, if any, to `new_name`, so it is
    /// installed into the renamed stub.
    pub fn rename(&mut self, name: &str, new_name: &str) {
        if let Some(ticket) = self.names.remove(name) {
            if let Some(request) = self.requests.get_mut(&ticket) {
                request.name = new_name.to_owned();
            }

            self.names.insert(new_name.to_owned(), ticket);
        }
    }

    /// The stage of the asynchronous load of `name`, if any.
    pub fn state(&self, name: &str) -> Option<LoadState> {
        self.names
            .get(name)
            .and_then(|v| self.requests.get(v))
            .map(|v| v.state)
    }

    /// The number of requests ever created.
    #[inline]
    pub fn requests_created(&self) -> usize {
        self.created
    }

    /// The number of requests that have not been finalized yet.
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.requests.len()
    }
}

fn fan_out(request: &LoadRequest, ticket: LoadTicket, asset: &Asset) {
    for target in &request.targets {
        asset_ref::fulfil(target, ticket, asset);
    }
}

fn abandon(request: &LoadRequest, ticket: LoadTicket) {
    for target in &request.targets {
        asset_ref::abandon(target, ticket);
    }
}
