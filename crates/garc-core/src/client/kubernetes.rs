use async_trait::async_trait;
use k8s_openapi::{
    NamespaceResourceScope,
    api::{apps::v1::Deployment, core::v1::ConfigMap},
};
use kube::{
    Api, Client, Resource,
    api::{DeleteParams, ListParams, PostParams},
    runtime::events::{Event, EventType, Recorder, Reporter},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use garc_model::Runner;

use super::{ClientError, ClientResult, ClusterClient, RunnerEvent};
use crate::owner::ChildKind;

/// Name events are reported under.
pub const EVENT_REPORTER: &str = "github-actions-runner-controller";

/// [`ClusterClient`] backed by the API server.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    recorder: Recorder,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: EVENT_REPORTER.into(),
            instance: std::env::var("HOSTNAME").ok(),
        };
        Self {
            recorder: Recorder::new(client.clone(), reporter),
            client,
        }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get<K>(&self, namespace: &str, name: &str) -> ClientResult<Option<K>>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + std::fmt::Debug,
    {
        self.api::<K>(namespace)
            .get_opt(name)
            .await
            .map_err(ClientError::from)
    }

    async fn list<K>(&self, namespace: &str) -> ClientResult<Vec<K>>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + std::fmt::Debug,
    {
        let list = self.api::<K>(namespace).list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn create<K>(&self, obj: &K) -> ClientResult<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Serialize
            + DeserializeOwned
            + std::fmt::Debug,
    {
        let ns = namespace_of(obj)?;
        Ok(self.api::<K>(&ns).create(&PostParams::default(), obj).await?)
    }

    async fn replace<K>(&self, kind: ChildKind, obj: &K) -> ClientResult<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Serialize
            + DeserializeOwned
            + std::fmt::Debug,
    {
        let ns = namespace_of(obj)?;
        let name = obj
            .meta()
            .name
            .clone()
            .ok_or_else(|| ClientError::Other("object has no name".into()))?;

        match self
            .api::<K>(&ns)
            .replace(&name, &PostParams::default(), obj)
            .await
        {
            Ok(updated) => Ok(updated),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Err(ClientError::Conflict { kind, name }),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete<K>(&self, namespace: &str, name: &str) -> ClientResult<()>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + std::fmt::Debug,
    {
        match self
            .api::<K>(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(child = %name, "already deleted");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn namespace_of<K: Resource>(obj: &K) -> ClientResult<String> {
    obj.meta()
        .namespace
        .clone()
        .ok_or_else(|| ClientError::Other("object has no namespace".into()))
}

impl From<kube::Error> for ClientError {
    fn from(e: kube::Error) -> Self {
        match e {
            kube::Error::Api(ae) => ClientError::Api {
                code: ae.code,
                message: ae.message,
            },
            other => ClientError::Other(other.to_string()),
        }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_runner(&self, namespace: &str, name: &str) -> ClientResult<Option<Runner>> {
        self.get(namespace, name).await
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> ClientResult<Option<ConfigMap>> {
        self.get(namespace, name).await
    }

    async fn list_config_maps(&self, namespace: &str) -> ClientResult<Vec<ConfigMap>> {
        self.list(namespace).await
    }

    async fn create_config_map(&self, cm: &ConfigMap) -> ClientResult<ConfigMap> {
        self.create(cm).await
    }

    async fn replace_config_map(&self, cm: &ConfigMap) -> ClientResult<ConfigMap> {
        self.replace(ChildKind::ConfigMap, cm).await
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> ClientResult<()> {
        self.delete::<ConfigMap>(namespace, name).await
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> ClientResult<Option<Deployment>> {
        self.get(namespace, name).await
    }

    async fn list_deployments(&self, namespace: &str) -> ClientResult<Vec<Deployment>> {
        self.list(namespace).await
    }

    async fn create_deployment(&self, d: &Deployment) -> ClientResult<Deployment> {
        self.create(d).await
    }

    async fn replace_deployment(&self, d: &Deployment) -> ClientResult<Deployment> {
        self.replace(ChildKind::Deployment, d).await
    }

    async fn delete_deployment(&self, namespace: &str, name: &str) -> ClientResult<()> {
        self.delete::<Deployment>(namespace, name).await
    }

    async fn publish_event(&self, runner: &Runner, event: RunnerEvent) {
        let ev = Event {
            type_: EventType::Normal,
            reason: event.reason.as_str().into(),
            note: Some(event.note()),
            action: "Reconcile".into(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&ev, &runner.object_ref(&())).await {
            warn!(reason = %event.reason, child = %event.child, error = %e, "failed to publish event");
        }
    }
}
