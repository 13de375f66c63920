// ABOUTME: Test support utilities.
// ABOUTME: Provides tracing setup, a recording dataplane agent and a fake dataplane.

use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use nsendpoint::address::AddressAllocator;
use nsendpoint::connection::{Connection, ConnectionState, Mechanism};
use nsendpoint::dataplane::{AgentError, DataChange, Dataplane, DataplaneAgent, DataplaneError};
use nsendpoint::endpoint::{Endpoint, EndpointSettings};
use nsendpoint::mechanism::MechanismType;
use nsendpoint::monitor::ConnectionMonitor;
use nsendpoint::types::{ConnectionId, NetworkServiceName};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("nsendpoint=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Agent that records every Put/Del and can be told to reject them.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct RecordingAgent {
    pub puts: Mutex<Vec<DataChange>>,
    pub dels: Mutex<Vec<DataChange>>,
    pub reject_put: AtomicBool,
    pub reject_del: AtomicBool,
}

#[allow(dead_code)]
impl RecordingAgent {
    pub fn rejecting_puts() -> Self {
        let agent = Self::default();
        agent.reject_put.store(true, Ordering::SeqCst);
        agent
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().len()
    }

    pub fn del_count(&self) -> usize {
        self.dels.lock().len()
    }
}

fn rejected() -> AgentError {
    AgentError::Rejected {
        status: 500,
        message: "rejected by test agent".to_string(),
    }
}

#[async_trait]
impl DataplaneAgent for RecordingAgent {
    async fn put(&self, change: &DataChange) -> Result<(), AgentError> {
        self.puts.lock().push(change.clone());
        if self.reject_put.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        Ok(())
    }

    async fn del(&self, change: &DataChange) -> Result<(), AgentError> {
        self.dels.lock().push(change.clone());
        if self.reject_del.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        Ok(())
    }
}

/// In-memory dataplane counting each call, with knobs for failures and delays.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct FakeDataplane {
    pub bridge_domains: Mutex<HashSet<String>>,
    pub creations: AtomicUsize,
    pub ensure_calls: AtomicUsize,
    pub programmed: AtomicUsize,
    pub teardowns: AtomicUsize,
    pub fail_ensure: AtomicBool,
    pub fail_program: AtomicBool,
    pub fail_teardown: AtomicBool,
    pub ensure_delay: Option<Duration>,
    pub program_delay: Option<Duration>,
    pub teardown_delay: Option<Duration>,
}

#[allow(dead_code)]
impl FakeDataplane {
    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    pub fn ensure_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }

    pub fn programmed(&self) -> usize {
        self.programmed.load(Ordering::SeqCst)
    }

    pub fn teardowns(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }

    pub fn with_ensure_delay(mut self, delay: Duration) -> Self {
        self.ensure_delay = Some(delay);
        self
    }

    pub fn with_program_delay(mut self, delay: Duration) -> Self {
        self.program_delay = Some(delay);
        self
    }

    pub fn with_teardown_delay(mut self, delay: Duration) -> Self {
        self.teardown_delay = Some(delay);
        self
    }

    pub fn failing_teardown(self) -> Self {
        self.fail_teardown.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_program(self) -> Self {
        self.fail_program.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl Dataplane for FakeDataplane {
    async fn ensure_bridge_domain(&self, name: &str) -> Result<(), DataplaneError> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.ensure_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_ensure.load(Ordering::SeqCst) {
            return Err(DataplaneError::Other("bridge domain refused".to_string()));
        }
        if self.bridge_domains.lock().insert(name.to_string()) {
            self.creations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn program_connection(
        &self,
        _connection: &Connection,
        _bridge_domain: &str,
    ) -> Result<(), DataplaneError> {
        if let Some(delay) = self.program_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_program.load(Ordering::SeqCst) {
            return Err(DataplaneError::Other("program refused".to_string()));
        }
        self.programmed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn teardown_connection(
        &self,
        _connection: &Connection,
        _bridge_domain: &str,
    ) -> Result<(), DataplaneError> {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.teardown_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_teardown.load(Ordering::SeqCst) {
            return Err(DataplaneError::Other("teardown refused".to_string()));
        }
        Ok(())
    }
}

#[allow(dead_code)]
pub fn service(name: &str) -> NetworkServiceName {
    NetworkServiceName::new(name).unwrap()
}

/// Settings for an endpoint advertising `icmp-responder` with every mechanism enabled.
#[allow(dead_code)]
pub fn settings() -> EndpointSettings {
    let mut settings = EndpointSettings::new(service("icmp-responder"));
    settings.endpoint_name = "nse-test".to_string();
    settings.supported = MechanismType::ALL.to_vec();
    settings.workspace = PathBuf::from("/tmp/nsm");
    settings.netns_inode = Some(4026531992);
    settings.dataplane_timeout = Duration::from_secs(5);
    settings
}

#[allow(dead_code)]
pub fn endpoint(dataplane: FakeDataplane) -> Endpoint<FakeDataplane> {
    endpoint_with(settings(), dataplane, 24)
}

#[allow(dead_code)]
pub fn endpoint_with(
    settings: EndpointSettings,
    dataplane: FakeDataplane,
    prefix_len: u8,
) -> Endpoint<FakeDataplane> {
    let allocator = AddressAllocator::new(Ipv4Addr::new(10, 20, 1, 1), prefix_len).unwrap();
    Endpoint::new(settings, dataplane, allocator, ConnectionMonitor::new(16))
}

/// A kernel connection record for monitor tests.
#[allow(dead_code)]
pub fn connection(id: &str) -> Connection {
    let mut parameters = BTreeMap::new();
    parameters.insert("netnsInode".to_string(), "4026531992".to_string());
    parameters.insert("name".to_string(), format!("eth-{id}"));
    Connection {
        id: ConnectionId::new(id),
        network_service: service("icmp-responder"),
        mechanism: Mechanism {
            mechanism_type: MechanismType::Kernel,
            parameters,
        },
        source_address: Ipv4Addr::new(10, 20, 1, 1),
        destination_address: Ipv4Addr::new(10, 20, 1, 2),
        state: ConnectionState::Active,
        endpoint: "nse-test".to_string(),
        labels: BTreeMap::new(),
        established_at: Utc::now(),
    }
}
