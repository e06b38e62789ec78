//! Shared fixtures: scripted discovery backends and stub lookups.

use async_trait::async_trait;
use boardwatch::{
    board::BoardCandidate,
    discovery::{DiscoveryBackend, DiscoveryEvent, DiscoveryManager},
    lookup::RemoteLookup,
    session::{Explorer, Instance, InstanceRegistry},
    signatures::{SignatureDatabase, SignatureFile},
    BoardService, Error, Port, Result,
};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

pub const UNO_SIGNATURES: &str = r#"{
    "platforms": [
        {
            "packager": "arduino",
            "architecture": "avr",
            "maintainer": "Arduino",
            "boards": [
                {
                    "id": "uno",
                    "name": "Arduino Uno",
                    "identification": [ { "vid": "0x2341", "pid": "0x0043" } ]
                }
            ]
        }
    ]
}"#;

pub fn usb_port(address: &str, vid: &str, pid: &str) -> Port {
    Port::new(address, "serial").with_properties([("vid", vid), ("pid", pid)].into_iter().collect())
}

pub fn plain_port(address: &str) -> Port {
    Port::new(address, "serial")
}

/// Discovery backend driven by the test.
pub struct ScriptedBackend {
    id: &'static str,
    ports: Vec<Port>,
    fail_start: bool,
    feed: Mutex<Option<mpsc::Receiver<DiscoveryEvent>>>,
}

impl ScriptedBackend {
    /// A backend that lists `ports` and never reports events.
    pub fn listing(id: &'static str, ports: Vec<Port>) -> Arc<Self> {
        Arc::new(Self {
            id,
            ports,
            fail_start: false,
            feed: Mutex::new(None),
        })
    }

    /// A backend whose start always fails.
    pub fn broken(id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            ports: Vec::new(),
            fail_start: true,
            feed: Mutex::new(None),
        })
    }

    /// A backend that forwards whatever the test sends on the returned
    /// sender while it is being monitored.
    pub fn scripted(id: &'static str) -> (Arc<Self>, mpsc::Sender<DiscoveryEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let backend = Arc::new(Self {
            id,
            ports: Vec::new(),
            fail_start: false,
            feed: Mutex::new(Some(rx)),
        });
        (backend, tx)
    }
}

#[async_trait]
impl DiscoveryBackend for ScriptedBackend {
    fn id(&self) -> &str {
        self.id
    }

    async fn start(&self) -> Result<()> {
        if self.fail_start {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            )))
        } else {
            Ok(())
        }
    }

    fn list(&self) -> Vec<Port> {
        self.ports.clone()
    }

    async fn monitor(
        &self,
        events: mpsc::Sender<DiscoveryEvent>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let feed = self.feed.lock().take();
        let Some(mut feed) = feed else {
            shutdown.cancelled().await;
            return Ok(());
        };

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = feed.recv() => match event {
                    Some(event) => {
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        shutdown.cancelled().await;
                        break;
                    }
                },
            }
        }
        Ok(())
    }
}

type Responder = dyn Fn(&str, &str) -> Result<Vec<BoardCandidate>> + Send + Sync;

/// Remote lookup answering from a closure and counting calls.
pub struct FnLookup {
    respond: Box<Responder>,
    calls: AtomicUsize,
}

impl FnLookup {
    pub fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&str, &str) -> Result<Vec<BoardCandidate>> + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteLookup for FnLookup {
    async fn by_vid_pid(&self, vid: &str, pid: &str) -> Result<Vec<BoardCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(vid, pid)
    }
}

/// Remote lookup that blocks until the test releases it.
pub struct GatedLookup {
    pub entered: Notify,
    pub release: Notify,
    candidate: BoardCandidate,
}

impl GatedLookup {
    pub fn new(candidate: BoardCandidate) -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            release: Notify::new(),
            candidate,
        })
    }
}

#[async_trait]
impl RemoteLookup for GatedLookup {
    async fn by_vid_pid(&self, _vid: &str, _pid: &str) -> Result<Vec<BoardCandidate>> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(vec![self.candidate.clone()])
    }
}

pub fn signatures(json: &str) -> Arc<dyn SignatureDatabase> {
    Arc::new(SignatureFile::from_json(json).expect("valid signature fixture"))
}

pub fn no_signatures() -> Arc<dyn SignatureDatabase> {
    Arc::new(SignatureFile::empty())
}

/// Build a service with one instance over `backends`.
pub fn service(
    backends: Vec<Arc<dyn DiscoveryBackend>>,
    signatures: Arc<dyn SignatureDatabase>,
    remote: Arc<dyn RemoteLookup>,
) -> (BoardService, Instance) {
    let mut discovery = DiscoveryManager::new();
    for backend in backends {
        discovery.add(backend);
    }
    let registry = Arc::new(InstanceRegistry::new());
    let instance = registry.create(Explorer::new(discovery, signatures));
    (BoardService::new(registry, remote), instance)
}
