use crate::settings::ControllerSettings;

/// Renders the Dockerfile that turns `image` into a self-hosted runner image.
///
/// Output depends only on its inputs, so identical settings and base image
/// always render byte-identical text and never show up as config map drift.
pub fn build_workspace_recipe(image: &str, settings: &ControllerSettings) -> String {
    let binary_version = &settings.binary_version;
    let runner_version = &settings.runner_version;
    let binary_url = format!(
        "{base}/v{binary_version}/runner_{binary_version}_linux_amd64",
        base = settings.binary_release_base.trim_end_matches('/'),
    );

    format!(
        r#"
FROM {image}
USER root
ENV DEBIAN_FRONTEND=noninteractive
RUN (command -v apt && apt update && apt install -y ca-certificates iputils-ping tar sudo git) || \
      (command -v apt-get && apt-get update && apt-get install -y --no-install-recommends ca-certificates iputils-ping tar sudo git) || \
      (command -v dnf && dnf install -y ca-certificates iputils tar sudo git) || \
      (command -v yum && yum install -y ca-certificates iputils tar sudo git) || \
      (command -v zypper && zypper install -n ca-certificates iputils tar sudo git-core) || \
      (echo "Unknown OS version" && exit 1)

ADD {binary_url} /usr/local/bin/runner
RUN chmod +x /usr/local/bin/runner

RUN echo 'runner::60000:60000::/home/runner:/bin/sh' >> /etc/passwd
RUN echo 'runner::60000:' >> /etc/group
RUN mkdir -p /home/runner && chown -R runner:runner /home/runner

RUN echo "runner:!:0:0:99999:7:::" >> /etc/shadow
RUN echo "runner ALL=(ALL) NOPASSWD: ALL" | sudo EDITOR='tee -a' visudo

WORKDIR /home/runner

RUN /usr/local/bin/runner --only-install --runner-version {runner_version}

USER 60000

ENTRYPOINT ["/usr/local/bin/runner"]
"#
    )
}
