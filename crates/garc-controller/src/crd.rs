use kube::CustomResourceExt;

use garc_model::Runner;

/// Runner CRD manifest as YAML.
pub fn runner_crd_yaml() -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&Runner::crd())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_names_the_runner_kind() {
        let yaml = runner_crd_yaml().unwrap();
        assert!(yaml.contains("name: runners.garc.kaidotdev.github.io"));
        assert!(yaml.contains("kind: Runner"));
        assert!(yaml.contains("scope: Namespaced"));
    }
}
