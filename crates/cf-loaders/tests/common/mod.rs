#![allow(dead_code)]

use cf_client::ProviderClients;
use cf_core::{Config, FailurePolicy};
use cf_database_postgres::{MemoryStore, RefreshStore};
use cf_jobs::Clock;
use cf_loaders::{LoaderConfig, LoaderContext};
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Wall clock that only moves when told to
#[derive(Debug)]
pub struct StepClock {
  now: Mutex<DateTime<Utc>>,
}

impl StepClock {
  pub fn starting_at(rfc3339: &str) -> Arc<Self> {
    let now = DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc);
    Arc::new(Self { now: Mutex::new(now) })
  }

  pub fn advance(&self, by: Duration) {
    let mut now = self.now.lock().unwrap();
    *now += by;
  }
}

impl Clock for StepClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap()
  }
}

pub struct Harness {
  pub store: Arc<MemoryStore>,
  pub clock: Arc<StepClock>,
  pub context: Arc<LoaderContext>,
}

pub fn harness(base_url: &str, policy: FailurePolicy) -> Harness {
  harness_with(base_url, LoaderConfig::default().with_failure_policy(policy))
}

pub fn harness_with(base_url: &str, config: LoaderConfig) -> Harness {
  let store = Arc::new(MemoryStore::new());
  let clock = StepClock::starting_at("2025-03-01T12:00:00Z");
  let clients = ProviderClients::new(&Config::for_tests(base_url)).unwrap();
  let shared: Arc<dyn RefreshStore> = store.clone();
  let context =
    Arc::new(LoaderContext::new(clients, shared, config).with_clock(clock.clone()));
  Harness { store, clock, context }
}
