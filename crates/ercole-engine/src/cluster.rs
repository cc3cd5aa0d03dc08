use ercole_common::types::{ClusterInfo, HostData};

/// Rewrites VM hostnames of `clusters` to the matching fleet hostname.
///
/// A VM matches a fleet host when the full names are equal ignoring case,
/// or failing that when their short names (up to the first dot) are.
/// VMs that match nothing keep the name reported by the hypervisor.
pub fn reconcile_cluster_hostnames(clusters: &mut [ClusterInfo], fleet_hostnames: &[String]) {
    for vm in clusters.iter_mut().flat_map(|c| c.vms.iter_mut()) {
        if let Some(hostname) = match_fleet_hostname(&vm.hostname, fleet_hostnames) {
            vm.hostname = hostname.clone();
        }
    }
}

fn match_fleet_hostname<'a>(vm_hostname: &str, fleet_hostnames: &'a [String]) -> Option<&'a String> {
    if vm_hostname.is_empty() {
        return None;
    }
    fleet_hostnames
        .iter()
        .find(|h| h.eq_ignore_ascii_case(vm_hostname))
        .or_else(|| {
            let short = short_name(vm_hostname);
            fleet_hostnames
                .iter()
                .find(|h| short_name(h).eq_ignore_ascii_case(short))
        })
}

fn short_name(hostname: &str) -> &str {
    hostname.split('.').next().unwrap_or(hostname)
}

/// Qualifies unqualified Veritas peer names with the domain of the host
/// that reported them.
pub fn qualify_veritas_hostnames(hostdata: &mut HostData) {
    let status = &mut hostdata.cluster_membership_status;
    if !status.veritas_cluster_server {
        return;
    }
    let Some((_, domain)) = hostdata.hostname.split_once('.') else {
        return;
    };
    for peer in status
        .veritas_cluster_hostnames
        .iter_mut()
        .filter(|p| !p.is_empty() && !p.contains('.'))
    {
        *peer = format!("{peer}.{domain}");
    }
}
