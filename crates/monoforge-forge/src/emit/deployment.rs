//! Deployment descriptor emission (Nomad jobs, config templates, scripts).
//!
//! Narrow and optional: services without an effective deployment descriptor
//! are skipped, and the scripts only appear when at least one service
//! deploys.

use serde::Serialize;

use monoforge_core::resolver::ServiceView;

use crate::error::ForgeError;
use crate::layout::Layout;
use crate::registry::Registry;

use super::emit;
use super::scaffold::config_record;

#[derive(Serialize)]
struct JobRecord {
    service: String,
    datacenters: String,
    namespace: Option<String>,
    count: u32,
    cpu: u32,
    memory: u32,
    port: u16,
    env_var: String,
}

#[derive(Serialize)]
struct HealthService {
    name: String,
    port: u16,
    base_path: String,
}

#[derive(Serialize)]
struct HealthRecord {
    services: Vec<HealthService>,
}

fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("\"{v}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Emit one job file and one platform config template per deployable
/// service, plus the deploy and health-check scripts when anything deploys.
pub fn emit_deployments(
    registry: &Registry,
    layout: &Layout,
    views: &[ServiceView],
) -> Result<(), ForgeError> {
    let mut health = Vec::new();

    for (index, view) in views.iter().enumerate() {
        let Some(deployment) = &view.deployment else {
            continue;
        };
        let port = layout.service_port(index);
        let datacenters = if deployment.datacenters.is_empty() {
            quoted_list(&["dc1".to_string()])
        } else {
            quoted_list(&deployment.datacenters)
        };
        let record = JobRecord {
            service: view.name.clone(),
            datacenters,
            namespace: deployment.namespace.clone(),
            count: deployment.count.unwrap_or(1),
            cpu: deployment.cpu.unwrap_or(500),
            memory: deployment.memory.unwrap_or(256),
            port,
            env_var: format!("{}_CONFIG", view.name.to_uppercase()),
        };
        let job_path = layout
            .deployment_jobs_dir()
            .join(format!("{}.nomad", view.name));
        emit(registry, "deployment_job", &job_path, &record)?;

        let config_path = layout
            .deployment_config_dir()
            .join(format!("{}.yaml", view.name));
        emit(registry, "deployment_config", &config_path, &config_record(view, port))?;

        health.push(HealthService {
            name: view.name.clone(),
            port,
            base_path: format!("/{}", view.name),
        });
    }

    if health.is_empty() {
        return Ok(());
    }

    let scripts = layout.scripts_dir();
    emit(registry, "script_deploy", &scripts.join("deploy.sh"), &serde_json::json!({}))?;
    emit(
        registry,
        "script_health",
        &scripts.join("health-check.sh"),
        &HealthRecord { services: health },
    )?;
    mark_executable(&scripts.join("deploy.sh"))?;
    mark_executable(&scripts.join("health-check.sh"))
}

#[cfg(unix)]
fn mark_executable(path: &std::path::Path) -> Result<(), ForgeError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|source| ForgeError::io("emitter:script_deploy", path, source))
}

#[cfg(not(unix))]
fn mark_executable(_path: &std::path::Path) -> Result<(), ForgeError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn deployable_view() -> ServiceView {
        let doc = format!(
            "{}\ndeployment:\n  platform: nomad\n  datacenters: [dc1, dc2]\n  count: 2\n",
            crate::emit::testutil::ATOM_SPEC.trim_end()
        );
        let spec = monoforge_core::load(doc.as_bytes()).unwrap();
        monoforge_core::derive(&spec, "todo").unwrap()
    }

    #[test]
    fn test_job_and_scripts_emitted_for_deployable_service() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), "example.com/todo");
        let registry = Registry::new().unwrap();
        emit_deployments(&registry, &layout, &[deployable_view()]).unwrap();

        let job = fs::read_to_string(
            tmp.path().join("deployments/nomad/jobs/todo.nomad"),
        )
        .unwrap();
        assert!(job.contains("job \"todo\" {"));
        assert!(job.contains("datacenters = [\"dc1\", \"dc2\"]"));
        assert!(job.contains("count = 2"));

        assert!(tmp.path().join("scripts/deploy.sh").exists());
        assert!(tmp.path().join("scripts/health-check.sh").exists());
        assert!(tmp
            .path()
            .join("deployments/nomad/config/todo.yaml")
            .exists());
    }

    #[test]
    fn test_no_deployment_means_no_scripts() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), "example.com/todo");
        let registry = Registry::new().unwrap();
        emit_deployments(&registry, &layout, &[crate::emit::testutil::atom_view()]).unwrap();

        assert!(!tmp.path().join("scripts").exists());
        assert!(!tmp.path().join("deployments").exists());
    }
}
