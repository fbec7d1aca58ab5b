//! In-memory [`ClusterClient`] for reconciler tests.
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::ConfigMap};
use kube::Resource;

use garc_model::Runner;

use super::{ClientError, ClientResult, ClusterClient, RunnerEvent};
use crate::owner::ChildKind;

type Key = (String, String);

#[derive(Default)]
pub struct FakeCluster {
    runners: Mutex<BTreeMap<Key, Runner>>,
    config_maps: Mutex<BTreeMap<Key, ConfigMap>>,
    deployments: Mutex<BTreeMap<Key, Deployment>>,
    events: Mutex<Vec<RunnerEvent>>,
    writes: Mutex<Vec<(ChildKind, &'static str, String)>>,
    conflicts: AtomicUsize,
    next_version: AtomicUsize,
}

fn key_of<K: Resource>(obj: &K) -> Key {
    (
        obj.meta().namespace.clone().unwrap_or_default(),
        obj.meta().name.clone().unwrap_or_default(),
    )
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_runner(&self, mut runner: Runner) {
        if runner.metadata.uid.is_none() {
            runner.metadata.uid = Some(format!("uid-{}", runner.metadata.name.clone().unwrap_or_default()));
        }
        self.runners.lock().unwrap().insert(key_of(&runner), runner);
    }

    pub fn remove_runner(&self, namespace: &str, name: &str) {
        self.runners
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
    }

    /// Seeds a child directly, bypassing write accounting.
    pub fn seed_config_map(&self, cm: ConfigMap) {
        self.config_maps.lock().unwrap().insert(key_of(&cm), cm);
    }

    pub fn seed_deployment(&self, d: Deployment) {
        self.deployments.lock().unwrap().insert(key_of(&d), d);
    }

    pub fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        self.config_maps
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn deployment(&self, namespace: &str, name: &str) -> Option<Deployment> {
        self.deployments
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Fail the next `n` deployment replaces with a conflict.
    pub fn fail_deployment_updates(&self, n: usize) {
        self.conflicts.store(n, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<(ChildKind, &'static str, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn count(&self, kind: ChildKind, action: &str) -> usize {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, a, _)| *k == kind && *a == action)
            .count()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
        self.events.lock().unwrap().clear();
    }

    pub fn events(&self) -> Vec<RunnerEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, kind: ChildKind, action: &'static str, name: &str) {
        self.writes
            .lock()
            .unwrap()
            .push((kind, action, name.to_string()));
    }

    fn stamp<K: Resource>(&self, obj: &mut K) {
        let v = self.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        let meta = obj.meta_mut();
        meta.resource_version = Some(v.to_string());
        if meta.uid.is_none() {
            meta.uid = Some(format!("child-{v}"));
        }
    }
}

fn list_in<K: Clone>(map: &Mutex<BTreeMap<Key, K>>, namespace: &str) -> Vec<K> {
    map.lock()
        .unwrap()
        .iter()
        .filter(|((ns, _), _)| ns == namespace)
        .map(|(_, v)| v.clone())
        .collect()
}

fn get_in<K: Clone>(map: &Mutex<BTreeMap<Key, K>>, namespace: &str, name: &str) -> Option<K> {
    map.lock()
        .unwrap()
        .get(&(namespace.to_string(), name.to_string()))
        .cloned()
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get_runner(&self, namespace: &str, name: &str) -> ClientResult<Option<Runner>> {
        Ok(get_in(&self.runners, namespace, name))
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> ClientResult<Option<ConfigMap>> {
        Ok(get_in(&self.config_maps, namespace, name))
    }

    async fn list_config_maps(&self, namespace: &str) -> ClientResult<Vec<ConfigMap>> {
        Ok(list_in(&self.config_maps, namespace))
    }

    async fn create_config_map(&self, cm: &ConfigMap) -> ClientResult<ConfigMap> {
        let key = key_of(cm);
        let mut stored = cm.clone();
        self.stamp(&mut stored);
        let mut map = self.config_maps.lock().unwrap();
        if map.contains_key(&key) {
            return Err(ClientError::Api { code: 409, message: "already exists".into() });
        }
        map.insert(key.clone(), stored.clone());
        drop(map);
        self.record(ChildKind::ConfigMap, "create", &key.1);
        Ok(stored)
    }

    async fn replace_config_map(&self, cm: &ConfigMap) -> ClientResult<ConfigMap> {
        let key = key_of(cm);
        let mut stored = cm.clone();
        self.stamp(&mut stored);
        self.config_maps.lock().unwrap().insert(key.clone(), stored.clone());
        self.record(ChildKind::ConfigMap, "update", &key.1);
        Ok(stored)
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> ClientResult<()> {
        self.config_maps
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
        self.record(ChildKind::ConfigMap, "delete", name);
        Ok(())
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> ClientResult<Option<Deployment>> {
        Ok(get_in(&self.deployments, namespace, name))
    }

    async fn list_deployments(&self, namespace: &str) -> ClientResult<Vec<Deployment>> {
        Ok(list_in(&self.deployments, namespace))
    }

    async fn create_deployment(&self, d: &Deployment) -> ClientResult<Deployment> {
        let key = key_of(d);
        let mut stored = d.clone();
        self.stamp(&mut stored);
        let mut map = self.deployments.lock().unwrap();
        if map.contains_key(&key) {
            return Err(ClientError::Api { code: 409, message: "already exists".into() });
        }
        map.insert(key.clone(), stored.clone());
        drop(map);
        self.record(ChildKind::Deployment, "create", &key.1);
        Ok(stored)
    }

    async fn replace_deployment(&self, d: &Deployment) -> ClientResult<Deployment> {
        let key = key_of(d);
        let pending = self.conflicts.load(Ordering::SeqCst);
        if pending > 0 {
            self.conflicts.store(pending - 1, Ordering::SeqCst);
            return Err(ClientError::Conflict {
                kind: ChildKind::Deployment,
                name: key.1,
            });
        }
        let mut stored = d.clone();
        self.stamp(&mut stored);
        self.deployments.lock().unwrap().insert(key.clone(), stored.clone());
        self.record(ChildKind::Deployment, "update", &key.1);
        Ok(stored)
    }

    async fn delete_deployment(&self, namespace: &str, name: &str) -> ClientResult<()> {
        self.deployments
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
        self.record(ChildKind::Deployment, "delete", name);
        Ok(())
    }

    async fn publish_event(&self, _runner: &Runner, event: RunnerEvent) {
        self.events.lock().unwrap().push(event);
    }
}
