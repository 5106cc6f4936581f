// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Name-keyed registry of delivery channels.

use std::collections::HashMap;
use std::sync::Arc;

use herald_config::HeraldConfig;
use herald_core::{HeraldError, Pusher};
use tracing::debug;

use crate::log::LogPusher;
use crate::serverchan::ServerChanPusher;

/// Builds a pusher from configuration.
pub trait PusherFactory: Send + Sync {
    /// Registry name of the pusher this factory produces.
    fn name(&self) -> &'static str;

    /// Creates the pusher, or returns `Config` when its settings are missing.
    fn create(&self, config: &HeraldConfig) -> Result<Arc<dyn Pusher>, HeraldError>;
}

struct LogFactory;

impl PusherFactory for LogFactory {
    fn name(&self) -> &'static str {
        LogPusher::NAME
    }

    fn create(&self, _config: &HeraldConfig) -> Result<Arc<dyn Pusher>, HeraldError> {
        Ok(Arc::new(LogPusher::new()))
    }
}

struct ServerChanFactory;

impl PusherFactory for ServerChanFactory {
    fn name(&self) -> &'static str {
        ServerChanPusher::NAME
    }

    fn create(&self, config: &HeraldConfig) -> Result<Arc<dyn Pusher>, HeraldError> {
        let send_key = config.serverchan.send_key.as_deref().ok_or_else(|| {
            HeraldError::Config("serverchan.send_key is not configured".to_string())
        })?;
        Ok(Arc::new(ServerChanPusher::new(
            send_key,
            config.serverchan.endpoint.clone(),
        )?))
    }
}

/// Factories for every compiled-in pusher.
pub fn builtin_factories() -> Vec<Box<dyn PusherFactory>> {
    vec![Box::new(LogFactory), Box::new(ServerChanFactory)]
}

/// Registry of available pushers keyed by name.
#[derive(Default)]
pub struct PusherRegistry {
    pushers: HashMap<String, Arc<dyn Pusher>>,
}

impl std::fmt::Debug for PusherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PusherRegistry")
            .field("pushers", &self.list())
            .finish()
    }
}

impl PusherRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in pusher whose configuration is complete.
    ///
    /// Pushers whose factory reports missing settings are skipped.
    pub fn with_builtins(config: &HeraldConfig) -> Result<Self, HeraldError> {
        let mut registry = Self::new();
        for factory in builtin_factories() {
            match factory.create(config) {
                Ok(pusher) => registry.register(pusher)?,
                Err(HeraldError::Config(reason)) => {
                    debug!(pusher = factory.name(), reason = %reason, "pusher not configured, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(registry)
    }

    /// Register a pusher under its own name.
    ///
    /// Empty names and names already taken are rejected.
    pub fn register(&mut self, pusher: Arc<dyn Pusher>) -> Result<(), HeraldError> {
        let name = pusher.name().trim().to_string();
        if name.is_empty() {
            return Err(HeraldError::Config(
                "pusher name must not be empty".to_string(),
            ));
        }
        if self.pushers.contains_key(&name) {
            return Err(HeraldError::Config(format!(
                "pusher `{name}` is already registered"
            )));
        }
        self.pushers.insert(name, pusher);
        Ok(())
    }

    /// Look up a pusher by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Pusher>, HeraldError> {
        self.pushers
            .get(name)
            .cloned()
            .ok_or_else(|| HeraldError::PusherNotFound {
                name: name.to_string(),
            })
    }

    /// Remove a pusher, returning it if it was registered.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Pusher>> {
        self.pushers.remove(name)
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pushers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.pushers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pushers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use herald_core::Message;

    struct Named(&'static str);

    #[async_trait]
    impl Pusher for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn push(&self, _message: &Message) -> Result<(), HeraldError> {
            Ok(())
        }
    }

    #[test]
    fn register_and_get() {
        let mut registry = PusherRegistry::new();
        assert!(registry.is_empty());
        registry.register(Arc::new(Named("email"))).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("email").unwrap().name(), "email");
    }

    #[test]
    fn get_unknown_is_not_found() {
        let registry = PusherRegistry::new();
        let err = registry.get("pager").err().unwrap();
        assert!(matches!(err, HeraldError::PusherNotFound { name } if name == "pager"));
    }

    #[test]
    fn duplicate_and_empty_names_are_rejected() {
        let mut registry = PusherRegistry::new();
        registry.register(Arc::new(Named("sms"))).unwrap();
        assert!(registry.register(Arc::new(Named("sms"))).is_err());
        assert!(registry.register(Arc::new(Named(" "))).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn list_is_sorted() {
        let mut registry = PusherRegistry::new();
        registry.register(Arc::new(Named("sms"))).unwrap();
        registry.register(Arc::new(Named("email"))).unwrap();
        registry.register(Arc::new(Named("log"))).unwrap();
        assert_eq!(registry.list(), vec!["email", "log", "sms"]);
    }

    #[test]
    fn unregister_removes_entry() {
        let mut registry = PusherRegistry::new();
        registry.register(Arc::new(Named("sms"))).unwrap();
        assert!(registry.unregister("sms").is_some());
        assert!(registry.unregister("sms").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn builtins_skip_unconfigured_serverchan() {
        let config = HeraldConfig::default();
        let registry = PusherRegistry::with_builtins(&config).unwrap();
        assert_eq!(registry.list(), vec!["log"]);
    }

    #[test]
    fn builtins_include_serverchan_with_send_key() {
        let mut config = HeraldConfig::default();
        config.serverchan.send_key = Some("SCTkey".to_string());
        let registry = PusherRegistry::with_builtins(&config).unwrap();
        assert_eq!(registry.list(), vec!["log", "serverchan"]);
    }

    #[test]
    fn builtin_factory_names() {
        let names: Vec<&str> = builtin_factories().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["log", "serverchan"]);
    }
}
