//! Task definition canonicalization rules.

use crate::model::{NetworkMode, TaskDefinition};

use super::sort_key;

/// Canonicalizes a task definition in place.
///
/// Collections are sorted by a stable key, `awsvpc` port mappings get their
/// implicit host port, and human CPU/memory units are converted to the API's
/// base units.
pub fn canonicalize_task_definition(td: &mut TaskDefinition) {
    let awsvpc = td.network_mode == Some(NetworkMode::Awsvpc);
    for cd in &mut td.container_definitions {
        cd.environment.sort_by(|a, b| a.name.cmp(&b.name));
        cd.mount_points.sort_by_cached_key(sort_key);
        // host port must equal container port for awsvpc; fill before sorting
        if awsvpc {
            for pm in &mut cd.port_mappings {
                if pm.host_port.is_none() {
                    pm.host_port = pm.container_port;
                }
            }
        }
        cd.port_mappings.sort_by_cached_key(sort_key);
        cd.volumes_from.sort_by_cached_key(sort_key);
        cd.secrets.sort_by(|a, b| a.name.cmp(&b.name));
    }
    td.placement_constraints.sort_by_cached_key(sort_key);
    td.requires_compatibilities.sort();
    td.volumes.sort_by_cached_key(sort_key);
    td.tags.sort_by(|a, b| a.key.cmp(&b.key));
    td.container_definitions.sort_by(|a, b| a.name.cmp(&b.name));

    td.cpu = td.cpu.take().and_then(|cpu| to_number_cpu(&cpu));
    td.memory = td.memory.take().and_then(|memory| to_number_memory(&memory));

    if let Some(proxy) = td.proxy_configuration.as_mut() {
        proxy.properties.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

/// Converts a task CPU value to CPU units.
///
/// `"2 vCPU"` becomes `"2048"`; values without a `vcpu` suffix pass through.
/// Returns `None` when the suffix is present but the number does not parse.
#[must_use]
pub fn to_number_cpu(cpu: &str) -> Option<String> {
    match cpu.to_ascii_lowercase().find("vcpu") {
        Some(i) if i > 0 => scale_by_1024(&cpu[..i]),
        _ => Some(cpu.to_string()),
    }
}

/// Converts a task memory value to MiB.
///
/// `"4GB"` becomes `"4096"`; values without a `GB` suffix pass through.
/// Returns `None` when the suffix is present but the number does not parse.
#[must_use]
pub fn to_number_memory(memory: &str) -> Option<String> {
    match memory.find("GB") {
        Some(i) if i > 0 => scale_by_1024(&memory[..i]),
        _ => Some(memory.to_string()),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn scale_by_1024(number: &str) -> Option<String> {
    let n: f64 = number.trim().parse().ok()?;
    Some(((n * 1024.0) as i64).to_string())
}
