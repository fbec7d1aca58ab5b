use std::collections::BTreeMap;

use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment},
        core::v1::{
            Affinity, Capabilities, ConfigMapVolumeSource, Container, ContainerPort,
            EnvFromSource, EnvVar, EnvVarSource, ObjectFieldSelector, PodAffinityTerm,
            PodAntiAffinity, PodSecurityContext, PodSpec, PodTemplateSpec, SeccompProfile,
            SecurityContext, Volume, VolumeMount, WeightedPodAffinityTerm,
        },
    },
    apimachinery::pkg::{
        apis::meta::v1::{LabelSelector, ObjectMeta},
        util::intstr::IntOrString,
    },
};

use garc_model::{
    ANNOTATION_IMAGE, ContainerOverrides, Credentials, LABEL_APP, RECIPE_KEY, RunnerSpec,
    deployment_name, workspace_name,
};

use super::tag::repository_tag;
use crate::settings::ControllerSettings;

const BUILDER_CONTAINER: &str = "kaniko";
const RUNNER_CONTAINER: &str = "runner";
const EXPORTER_CONTAINER: &str = "exporter";
const WORKSPACE_VOLUME: &str = "workspace";

const RUNNER_UID: i64 = 60000;
const EXPORTER_PORT: i32 = 9090;
const ANTI_AFFINITY_WEIGHT: i32 = 100;
const TOPOLOGY_HOSTNAME: &str = "kubernetes.io/hostname";
const CONFIG_MAP_DEFAULT_MODE: i32 = 0o644;
const TERMINATION_GRACE_SECONDS: i64 = 30;
const TERMINATION_MESSAGE_PATH: &str = "/dev/termination-log";
const TERMINATION_MESSAGE_POLICY: &str = "File";
const SECCOMP_RUNTIME_DEFAULT: &str = "RuntimeDefault";

const ENV_REPOSITORY: &str = "REPOSITORY";
const ENV_HOSTNAME: &str = "HOSTNAME";
const ENV_TOKEN: &str = "TOKEN";

/// Builds the deployment for one Runner.
///
/// `name` and `namespace` identify the owning Runner; the spec is read, never mutated.
pub fn build_deployment(
    name: &str,
    namespace: &str,
    spec: &RunnerSpec,
    settings: &ControllerSettings,
) -> Deployment {
    let tag = repository_tag(&spec.image, &settings.binary_version, &settings.runner_version);
    let app = deployment_name(name);
    let selector = BTreeMap::from([(LABEL_APP.to_string(), app.clone())]);

    let mut containers = vec![runner_container(spec, &tag, settings)];
    if settings.enable_runner_metrics {
        containers.push(exporter_container(spec, settings));
    }

    Deployment {
        metadata: ObjectMeta {
            name: Some(app.clone()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector.clone()),
                ..Default::default()
            },
            strategy: Some(DeploymentStrategy {
                type_: Some("RollingUpdate".into()),
                rolling_update: Some(RollingUpdateDeployment {
                    max_surge: Some(IntOrString::String("25%".into())),
                    max_unavailable: Some(IntOrString::Int(1)),
                }),
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(merged_labels(spec, &app)),
                    annotations: Some(merged_annotations(spec)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    affinity: Some(spread_replicas(selector)),
                    init_containers: Some(vec![builder_container(spec, &tag, settings)]),
                    containers,
                    volumes: Some(pod_volumes(name, spec)),
                    restart_policy: Some("Always".into()),
                    termination_grace_period_seconds: Some(TERMINATION_GRACE_SECONDS),
                    dns_policy: Some("ClusterFirst".into()),
                    security_context: Some(PodSecurityContext {
                        seccomp_profile: Some(runtime_default_seccomp()),
                        ..Default::default()
                    }),
                    scheduler_name: Some("default-scheduler".into()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// User labels plus the generated `app` label; the generated value wins.
fn merged_labels(spec: &RunnerSpec, app: &str) -> BTreeMap<String, String> {
    let mut labels = spec.template.metadata.labels.clone();
    labels.insert(LABEL_APP.to_string(), app.to_string());
    labels
}

/// User annotations plus the generated `image` annotation; the generated value wins.
fn merged_annotations(spec: &RunnerSpec) -> BTreeMap<String, String> {
    let mut annotations = spec.template.metadata.annotations.clone();
    annotations.insert(ANNOTATION_IMAGE.to_string(), spec.image.clone());
    annotations
}

fn spread_replicas(selector: BTreeMap<String, String>) -> Affinity {
    Affinity {
        pod_anti_affinity: Some(PodAntiAffinity {
            preferred_during_scheduling_ignored_during_execution: Some(vec![
                WeightedPodAffinityTerm {
                    weight: ANTI_AFFINITY_WEIGHT,
                    pod_affinity_term: PodAffinityTerm {
                        label_selector: Some(LabelSelector {
                            match_labels: Some(selector),
                            ..Default::default()
                        }),
                        topology_key: TOPOLOGY_HOSTNAME.into(),
                        ..Default::default()
                    },
                },
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn pod_volumes(name: &str, spec: &RunnerSpec) -> Vec<Volume> {
    let mut volumes = vec![Volume {
        name: WORKSPACE_VOLUME.into(),
        config_map: Some(ConfigMapVolumeSource {
            name: workspace_name(name).into(),
            default_mode: Some(CONFIG_MAP_DEFAULT_MODE),
            ..Default::default()
        }),
        ..Default::default()
    }];
    volumes.extend(spec.template.spec.volumes.iter().cloned());
    volumes
}

fn builder_container(spec: &RunnerSpec, tag: &str, settings: &ControllerSettings) -> Container {
    let overrides = &spec.builder_container_spec;

    let mut mounts = vec![VolumeMount {
        name: WORKSPACE_VOLUME.into(),
        mount_path: format!("/workspace/{RECIPE_KEY}"),
        sub_path: Some(RECIPE_KEY.into()),
        read_only: Some(true),
        ..Default::default()
    }];
    mounts.extend(overrides.volume_mounts.iter().cloned());

    Container {
        name: BUILDER_CONTAINER.into(),
        image: Some(settings.kaniko_image.clone()),
        image_pull_policy: Some("IfNotPresent".into()),
        args: Some(vec![
            format!("--dockerfile={RECIPE_KEY}"),
            "--context=dir:///workspace".into(),
            "--cache=true".into(),
            "--compressed-caching=false".into(),
            format!("--destination={}/{tag}", settings.push_registry_host),
        ]),
        env: non_empty(overrides.env.clone()),
        env_from: non_empty(overrides.env_from.clone()),
        volume_mounts: Some(mounts),
        resources: Some(resources(overrides)),
        termination_message_path: Some(TERMINATION_MESSAGE_PATH.into()),
        termination_message_policy: Some(TERMINATION_MESSAGE_POLICY.into()),
        ..Default::default()
    }
}

fn runner_container(spec: &RunnerSpec, tag: &str, settings: &ControllerSettings) -> Container {
    let overrides = &spec.runner_container_spec;

    let mut args = vec![
        "--without-install".to_string(),
        format!("--repository=$({ENV_REPOSITORY})"),
        format!("--hostname=$({ENV_HOSTNAME})"),
    ];
    let mut env = overrides.env.clone();
    env.push(literal_env(ENV_REPOSITORY, &spec.repository));
    env.push(EnvVar {
        name: ENV_HOSTNAME.into(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                api_version: Some("v1".into()),
                field_path: "metadata.name".into(),
            }),
            ..Default::default()
        }),
        ..Default::default()
    });
    let mut env_from = overrides.env_from.clone();

    match spec.credentials() {
        Credentials::App(secret) => {
            args.extend([
                "--github-app-id=$(github_app_id)".to_string(),
                "--github-app-installation-id=$(github_app_installation_id)".to_string(),
                "--github-app-private-key=$(github_app_private_key)".to_string(),
            ]);
            env_from.push(EnvFromSource {
                secret_ref: Some(secret.clone()),
                ..Default::default()
            });
        }
        Credentials::Token(_) => {
            args.push(format!("--token=$({ENV_TOKEN})"));
            env.extend(token_env(spec));
        }
        Credentials::None => {}
    }
    if settings.disable_update {
        args.push("--disableupdate".into());
    }

    Container {
        name: RUNNER_CONTAINER.into(),
        image: Some(format!("{}/{tag}", settings.pull_registry_host)),
        image_pull_policy: Some("Always".into()),
        args: Some(args),
        env: non_empty(env),
        env_from: non_empty(env_from),
        volume_mounts: non_empty(overrides.volume_mounts.clone()),
        resources: Some(resources(overrides)),
        security_context: Some(SecurityContext {
            privileged: Some(false),
            allow_privilege_escalation: Some(false),
            capabilities: Some(Capabilities {
                drop: Some(vec!["ALL".into()]),
                ..Default::default()
            }),
            read_only_root_filesystem: Some(false),
            run_as_user: Some(RUNNER_UID),
            run_as_non_root: Some(true),
            seccomp_profile: Some(runtime_default_seccomp()),
            ..Default::default()
        }),
        termination_message_path: Some(TERMINATION_MESSAGE_PATH.into()),
        termination_message_policy: Some(TERMINATION_MESSAGE_POLICY.into()),
        ..Default::default()
    }
}

fn exporter_container(spec: &RunnerSpec, settings: &ControllerSettings) -> Container {
    let mut env = vec![literal_env(ENV_REPOSITORY, &spec.repository)];
    env.extend(token_env(spec));

    Container {
        name: EXPORTER_CONTAINER.into(),
        image: Some(settings.exporter_image.clone()),
        image_pull_policy: Some("Always".into()),
        args: Some(vec![
            "server".into(),
            "--api-address=0.0.0.0:8000".into(),
            format!("--monitor-address=0.0.0.0:{EXPORTER_PORT}"),
            format!("--repository=$({ENV_REPOSITORY})"),
            format!("--token=$({ENV_TOKEN})"),
        ]),
        env: Some(env),
        ports: Some(vec![ContainerPort {
            container_port: EXPORTER_PORT,
            protocol: Some("TCP".into()),
            ..Default::default()
        }]),
        resources: Some(Default::default()),
        termination_message_path: Some(TERMINATION_MESSAGE_PATH.into()),
        termination_message_policy: Some(TERMINATION_MESSAGE_POLICY.into()),
        ..Default::default()
    }
}

/// `TOKEN` sourced from the static token secret, when one is configured.
fn token_env(spec: &RunnerSpec) -> Option<EnvVar> {
    spec.token_secret_key_ref.as_ref().map(|selector| EnvVar {
        name: ENV_TOKEN.into(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(selector.clone()),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn literal_env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.into(),
        value: Some(value.into()),
        ..Default::default()
    }
}

fn runtime_default_seccomp() -> SeccompProfile {
    SeccompProfile {
        type_: SECCOMP_RUNTIME_DEFAULT.into(),
        ..Default::default()
    }
}

// The API server returns `resources: {}` for a container without requirements.
fn resources(overrides: &ContainerOverrides) -> k8s_openapi::api::core::v1::ResourceRequirements {
    overrides.resources.clone().unwrap_or_default()
}

// The API server drops empty lists, so an empty list is stored as absent.
fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::{
        EmptyDirVolumeSource, ResourceRequirements, SecretEnvSource, SecretKeySelector,
    };
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

    use super::*;

    fn settings() -> ControllerSettings {
        ControllerSettings {
            push_registry_host: "push.example/runners".into(),
            pull_registry_host: "pull.example/runners".into(),
            ..Default::default()
        }
    }

    fn token_spec() -> RunnerSpec {
        RunnerSpec {
            image: "alpine:3.18".into(),
            repository: "org/repo".into(),
            token_secret_key_ref: Some(SecretKeySelector {
                name: "gh".into(),
                key: "token".into(),
                optional: None,
            }),
            ..Default::default()
        }
    }

    fn pod(d: &Deployment) -> &PodSpec {
        d.spec.as_ref().unwrap().template.spec.as_ref().unwrap()
    }

    fn container<'a>(d: &'a Deployment, name: &str) -> &'a Container {
        pod(d).containers.iter().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn images_use_push_and_pull_registries_with_same_tag() {
        let s = settings();
        let d = build_deployment("x", "ci", &token_spec(), &s);
        let tag = repository_tag("alpine:3.18", &s.binary_version, &s.runner_version);

        let builder = &pod(&d).init_containers.as_ref().unwrap()[0];
        let args = builder.args.as_ref().unwrap();
        assert!(args.contains(&format!("--destination=push.example/runners/{tag}")));
        assert_eq!(
            container(&d, "runner").image.as_deref(),
            Some(format!("pull.example/runners/{tag}").as_str())
        );
        assert_eq!(d.metadata.name.as_deref(), Some("x-runner"));
        assert_eq!(d.metadata.namespace.as_deref(), Some("ci"));
    }

    #[test]
    fn token_mode_passes_only_token_flag() {
        let d = build_deployment("x", "ci", &token_spec(), &settings());
        let runner = container(&d, "runner");
        let args = runner.args.as_ref().unwrap();

        assert!(args.contains(&"--repository=$(REPOSITORY)".to_string()));
        assert!(args.contains(&"--token=$(TOKEN)".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--github-app")));

        let env = runner.env.as_ref().unwrap();
        let token = env.iter().find(|e| e.name == "TOKEN").unwrap();
        let source = token.value_from.as_ref().unwrap().secret_key_ref.as_ref().unwrap();
        assert_eq!(source.key, "token");
        let repo = env.iter().find(|e| e.name == "REPOSITORY").unwrap();
        assert_eq!(repo.value.as_deref(), Some("org/repo"));
        assert!(runner.env_from.is_none());
    }

    #[test]
    fn app_mode_passes_only_app_flags() {
        let spec = RunnerSpec {
            app_secret_ref: Some(SecretEnvSource {
                name: "gh-app".into(),
                optional: None,
            }),
            ..token_spec()
        };
        let d = build_deployment("x", "ci", &spec, &settings());
        let runner = container(&d, "runner");
        let args = runner.args.as_ref().unwrap();

        assert!(!args.iter().any(|a| a.starts_with("--token")));
        assert_eq!(args.iter().filter(|a| a.starts_with("--github-app")).count(), 3);
        assert!(!runner.env.as_ref().unwrap().iter().any(|e| e.name == "TOKEN"));

        let from = runner.env_from.as_ref().unwrap();
        assert_eq!(from.len(), 1);
        assert_eq!(from[0].secret_ref.as_ref().unwrap().name, "gh-app");
    }

    #[test]
    fn generated_metadata_wins_over_template_fragment() {
        let mut spec = token_spec();
        spec.template.metadata.labels = BTreeMap::from([
            ("app".to_string(), "hijack".to_string()),
            ("team".to_string(), "ci".to_string()),
        ]);
        spec.template.metadata.annotations =
            BTreeMap::from([("image".to_string(), "other".to_string())]);
        let before = spec.clone();

        let d = build_deployment("x", "ci", &spec, &settings());
        let meta = d.spec.as_ref().unwrap().template.metadata.as_ref().unwrap();
        let labels = meta.labels.as_ref().unwrap();
        let annotations = meta.annotations.as_ref().unwrap();

        assert_eq!(labels.get("app").map(String::as_str), Some("x-runner"));
        assert_eq!(labels.get("team").map(String::as_str), Some("ci"));
        assert_eq!(annotations.get("image").map(String::as_str), Some("alpine:3.18"));
        assert_eq!(spec, before, "input spec must not be mutated");
    }

    #[test]
    fn workspace_volume_comes_before_user_volumes() {
        let mut spec = token_spec();
        spec.template.spec.volumes = vec![Volume {
            name: "cache".into(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        }];
        let d = build_deployment("x", "ci", &spec, &settings());
        let volumes = pod(&d).volumes.as_ref().unwrap();

        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].name, "workspace");
        assert_eq!(volumes[0].config_map.as_ref().unwrap().default_mode, Some(420));
        assert_eq!(volumes[1].name, "cache");

        let builder = &pod(&d).init_containers.as_ref().unwrap()[0];
        let mount = &builder.volume_mounts.as_ref().unwrap()[0];
        assert_eq!(mount.mount_path, "/workspace/Dockerfile");
        assert_eq!(mount.sub_path.as_deref(), Some("Dockerfile"));
        assert_eq!(mount.read_only, Some(true));
    }

    #[test]
    fn scheduling_and_rollout_policy() {
        let d = build_deployment("x", "ci", &token_spec(), &settings());
        let spec = d.spec.as_ref().unwrap();

        let rolling = spec.strategy.as_ref().unwrap().rolling_update.as_ref().unwrap();
        assert_eq!(rolling.max_surge, Some(IntOrString::String("25%".into())));
        assert_eq!(rolling.max_unavailable, Some(IntOrString::Int(1)));

        let terms = pod(&d)
            .affinity
            .as_ref()
            .unwrap()
            .pod_anti_affinity
            .as_ref()
            .unwrap()
            .preferred_during_scheduling_ignored_during_execution
            .as_ref()
            .unwrap();
        assert_eq!(terms[0].weight, 100);
        assert_eq!(terms[0].pod_affinity_term.topology_key, "kubernetes.io/hostname");
        assert_eq!(
            terms[0].pod_affinity_term.label_selector,
            Some(spec.selector.clone())
        );
    }

    #[test]
    fn runner_runs_unprivileged() {
        let d = build_deployment("x", "ci", &token_spec(), &settings());
        let sc = container(&d, "runner").security_context.clone().unwrap();

        assert_eq!(sc.run_as_user, Some(60000));
        assert_eq!(sc.run_as_non_root, Some(true));
        assert_eq!(sc.allow_privilege_escalation, Some(false));
        assert_eq!(sc.capabilities.unwrap().drop, Some(vec!["ALL".to_string()]));
        assert_eq!(sc.seccomp_profile.unwrap().type_, "RuntimeDefault");
    }

    #[test]
    fn exporter_is_gated_and_disableupdate_passed_through() {
        let plain = build_deployment("x", "ci", &token_spec(), &settings());
        assert_eq!(pod(&plain).containers.len(), 1);

        let s = ControllerSettings {
            enable_runner_metrics: true,
            disable_update: true,
            ..settings()
        };
        let d = build_deployment("x", "ci", &token_spec(), &s);
        let exporter = container(&d, "exporter");
        assert_eq!(exporter.ports.as_ref().unwrap()[0].container_port, 9090);
        assert!(exporter.env.as_ref().unwrap().iter().any(|e| e.name == "TOKEN"));
        assert!(container(&d, "runner")
            .args
            .as_ref()
            .unwrap()
            .contains(&"--disableupdate".to_string()));
    }

    #[test]
    fn container_overrides_are_applied() {
        let mut spec = token_spec();
        spec.runner_container_spec.resources = Some(ResourceRequirements {
            limits: Some(BTreeMap::from([("cpu".to_string(), Quantity("2".into()))])),
            ..Default::default()
        });
        spec.runner_container_spec.env = vec![literal_env("FOO", "bar")];

        let d = build_deployment("x", "ci", &spec, &settings());
        let runner = container(&d, "runner");
        let env = runner.env.as_ref().unwrap();
        assert_eq!(env[0].name, "FOO", "user env comes first");
        assert_eq!(
            runner.resources.as_ref().unwrap().limits.as_ref().unwrap()["cpu"],
            Quantity("2".into())
        );

        let builder = &pod(&d).init_containers.as_ref().unwrap()[0];
        assert_eq!(builder.resources, Some(ResourceRequirements::default()));
        assert!(builder.env.is_none());
    }
}
