//! # Environment overrides
//!
//! Queue settings follow the DogRS prefix convention: every key lives
//! under `DOG_TASKQ__`, and unset keys keep their built-in defaults.
//!
//! ```bash
//! export DOG_TASKQ__DEFAULT_QUEUE=mail
//! export DOG_TASKQ__MAX_WORKERS=4
//! export DOG_TASKQ__POLL_INTERVAL_MS=250
//! ```
//!
//! ```rust
//! use dog_taskq::config::QueueSettings;
//!
//! let settings = QueueSettings::from_lookup("APP__", |key| match key {
//!     "APP__PREFETCH_COUNT" => Some("20".to_string()),
//!     _ => None,
//! })
//! .unwrap();
//!
//! assert_eq!(settings.consumer_options().prefetch_count, 20);
//! ```

use std::str::FromStr;
use std::time::Duration;

use crate::bus::Bus;
use crate::consumer::ConsumerOptions;
use crate::{QueueError, QueueResult};

#[cfg(feature = "memory")]
use crate::backend::memory::MemoryQueueOptions;

/// Prefix of every environment key read by [`QueueSettings::from_env`]
pub const ENV_PREFIX: &str = "DOG_TASKQ__";

/// Optional overrides for buses, queues and consumers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSettings {
    pub default_queue: Option<String>,
    pub buffer_size: Option<usize>,
    pub max_num_worker: Option<usize>,
    pub prefetch_count: Option<usize>,
    pub poll_interval: Option<Duration>,
    pub fetch_timeout: Option<Duration>,
}

impl QueueSettings {
    /// Read overrides from the process environment
    pub fn from_env() -> QueueResult<Self> {
        Self::from_lookup(ENV_PREFIX, |key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`, keys being `prefix` + name
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> QueueResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{}{}", prefix, name))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Ok(Self {
            default_queue: get("DEFAULT_QUEUE"),
            buffer_size: parse(prefix, "BUFFER_SIZE", get("BUFFER_SIZE"))?,
            max_num_worker: parse(prefix, "MAX_WORKERS", get("MAX_WORKERS"))?,
            prefetch_count: parse(prefix, "PREFETCH_COUNT", get("PREFETCH_COUNT"))?,
            poll_interval: parse::<u64>(prefix, "POLL_INTERVAL_MS", get("POLL_INTERVAL_MS"))?
                .map(Duration::from_millis),
            fetch_timeout: parse::<u64>(prefix, "FETCH_TIMEOUT_MS", get("FETCH_TIMEOUT_MS"))?
                .map(Duration::from_millis),
        })
    }

    /// Consumer options with these overrides applied
    pub fn consumer_options(&self) -> ConsumerOptions {
        self.apply_to_consumer(ConsumerOptions::new())
    }

    /// Apply the overrides that are set, keeping the rest of `options`
    pub fn apply_to_consumer(&self, mut options: ConsumerOptions) -> ConsumerOptions {
        if let Some(max_num_worker) = self.max_num_worker {
            options.max_num_worker = max_num_worker;
        }
        if let Some(prefetch_count) = self.prefetch_count {
            options.prefetch_count = prefetch_count;
        }
        if let Some(poll_interval) = self.poll_interval {
            options.poll_interval = poll_interval;
        }
        if let Some(fetch_timeout) = self.fetch_timeout {
            options.fetch_timeout = fetch_timeout;
        }
        options
    }

    #[cfg(feature = "memory")]
    pub fn memory_options(&self) -> MemoryQueueOptions {
        let mut options = MemoryQueueOptions::new();
        if let Some(buffer_size) = self.buffer_size {
            options.buffer_size = buffer_size;
        }
        options
    }

    /// Set the bus default queue when one is configured
    pub fn apply_to_bus(&self, bus: &Bus) {
        if let Some(name) = &self.default_queue {
            bus.set_default(name.clone());
        }
    }
}

fn parse<T>(prefix: &str, name: &str, raw: Option<String>) -> QueueResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value.parse::<T>().map_err(|err| {
            QueueError::InvalidConfig(format!("{}{}={:?}: {}", prefix, name, value, err))
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_nothing_set() {
        let settings = QueueSettings::from_lookup(ENV_PREFIX, lookup(&[])).unwrap();
        assert_eq!(settings, QueueSettings::default());

        let options = settings.consumer_options().with_defaults();
        assert_eq!(options.prefetch_count, crate::consumer::DEFAULT_PREFETCH_COUNT);
    }

    #[test]
    fn test_overrides() {
        let settings = QueueSettings::from_lookup(
            ENV_PREFIX,
            lookup(&[
                ("DOG_TASKQ__DEFAULT_QUEUE", "mail"),
                ("DOG_TASKQ__MAX_WORKERS", "4"),
                ("DOG_TASKQ__POLL_INTERVAL_MS", " 250 "),
                ("DOG_TASKQ__FETCH_TIMEOUT_MS", "1500"),
                ("DOG_TASKQ__BUFFER_SIZE", ""),
            ]),
        )
        .unwrap();

        assert_eq!(settings.default_queue.as_deref(), Some("mail"));
        assert_eq!(settings.buffer_size, None);

        let options = settings.consumer_options();
        assert_eq!(options.max_num_worker, 4);
        assert_eq!(options.poll_interval, Duration::from_millis(250));
        assert_eq!(options.fetch_timeout, Duration::from_millis(1500));

        let bus = Bus::new();
        settings.apply_to_bus(&bus);
        assert_eq!(bus.default_name(), "mail");
    }

    #[test]
    fn test_invalid_number() {
        let result = QueueSettings::from_lookup(
            ENV_PREFIX,
            lookup(&[("DOG_TASKQ__PREFETCH_COUNT", "lots")]),
        );

        match result {
            Err(QueueError::InvalidConfig(msg)) => {
                assert!(msg.contains("DOG_TASKQ__PREFETCH_COUNT"))
            }
            other => panic!("expected invalid config, got {:?}", other),
        }
    }

    #[cfg(feature = "memory")]
    #[test]
    fn test_memory_options() {
        let settings = QueueSettings {
            buffer_size: Some(16),
            ..Default::default()
        };
        assert_eq!(settings.memory_options().buffer_size, 16);
    }
}
