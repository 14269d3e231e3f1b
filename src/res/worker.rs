//! The dedicated loader thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::errors::*;

use super::asset;
use super::asset_ref::AssetRef;
use super::factory::TypeFactory;
use super::request::{Completion, Job, Loaded, PendingReference, WorkerEvent};
use super::stream::{AssetReader, ReferenceResolver};

/// Owns the loader thread. The thread deserializes jobs in submission order and
/// never touches the registry, the stubs or the handles; everything it produces
/// travels back to the owning thread as a `WorkerEvent`.
pub(crate) struct Worker {
    jobs: Option<Sender<Job>>,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    pub fn spawn(factory: Arc<TypeFactory>, events: Sender<WorkerEvent>) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let shutdown = shutdown.clone();
            thread::Builder::new()
                .name("asset-loader".into())
                .spawn(move || run(&factory, &rx, &events, &shutdown))?
        };

        Ok(Worker {
            jobs: Some(tx),
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn send(&self, job: Job) -> Result<()> {
        self.jobs
            .as_ref()
            .ok_or(Error::WorkerDisconnected)?
            .send(job)
            .map_err(|_| Error::WorkerDisconnected)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.jobs.take();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("The asset loader thread panicked.");
            }
        }
    }
}

fn run(
    factory: &TypeFactory,
    jobs: &Receiver<Job>,
    events: &Sender<WorkerEvent>,
    shutdown: &AtomicBool,
) {
    for job in jobs.iter() {
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        if events.send(WorkerEvent::Started(job.ticket)).is_err() {
            break;
        }

        let mut collector = DependencyCollector::default();
        let result = load(factory, &job, &mut collector);

        let completion = Completion {
            ticket: job.ticket,
            result,
            references: collector.references,
        };

        if events.send(WorkerEvent::Finished(completion)).is_err() {
            break;
        }
    }
}

fn load(factory: &TypeFactory, job: &Job, collector: &mut DependencyCollector) -> Result<Loaded> {
    debug!("Deserializing asset {} from {}.", job.name, job.location);

    let mut object = factory.create(job.type_tag)?;
    let bytes = job.location.read()?;

    let mut reader = AssetReader::with_resolver(bytes, collector);
    let header = asset::deserialize(&mut *object, &mut reader)?;
    Ok((object, header))
}

// Records the references found in a body, the owning thread resolves them.
#[derive(Default)]
struct DependencyCollector {
    references: Vec<PendingReference>,
}

impl ReferenceResolver for DependencyCollector {
    fn resolve(&mut self, name: &str, target: &mut AssetRef) {
        target.set(None);
        self.references.push(PendingReference {
            name: name.to_owned(),
            target: target.downgrade(),
        });
    }
}
