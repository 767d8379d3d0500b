//! Core-to-role assignment and per-core resource layout (component C).
//!
//! Maps the available cores to worker/management roles by tier (§4.1),
//! then distributes worker cores across NIC ports by NUMA socket. Built
//! once at startup and treated as read-only afterward — every other
//! subsystem takes a `&CoreMap`, never a mutable one.

use crate::error::ResourceError;

pub const MAX_MGMT_CORES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreRole {
    Idle,
    Worker,
    PrimaryMgmt,
    Telemetry,
    CliApi,
    Watchdog,
}

struct Tier {
    lo: usize,
    hi: usize,
    mgmt_roles: &'static [CoreRole],
}

/// Tier table from §4.1. `hi = usize::MAX` for the open-ended top tier.
const TIERS: &[Tier] = &[
    Tier { lo: 2, hi: 4, mgmt_roles: &[CoreRole::PrimaryMgmt] },
    Tier { lo: 5, hi: 16, mgmt_roles: &[CoreRole::PrimaryMgmt] },
    Tier { lo: 17, hi: 64, mgmt_roles: &[CoreRole::PrimaryMgmt, CoreRole::Telemetry] },
    Tier {
        lo: 65,
        hi: 128,
        mgmt_roles: &[CoreRole::PrimaryMgmt, CoreRole::Telemetry, CoreRole::CliApi],
    },
    Tier {
        lo: 129,
        hi: usize::MAX,
        mgmt_roles: &[
            CoreRole::PrimaryMgmt,
            CoreRole::Telemetry,
            CoreRole::CliApi,
            CoreRole::Watchdog,
        ],
    },
];

fn select_tier(n_cores: usize) -> &'static Tier {
    TIERS
        .iter()
        .find(|t| n_cores >= t.lo && n_cores <= t.hi)
        .unwrap_or(&TIERS[TIERS.len() - 1])
}

/// How to pick the worker/management core split.
pub enum AssignMode {
    Auto,
    Manual { num_workers: usize, num_mgmt: usize },
}

/// Process-wide, read-only core→role map (§3 "Core map").
#[derive(Debug, Default)]
pub struct CoreMap {
    pub role: Vec<CoreRole>,
    pub worker_cores: Vec<usize>,
    pub mgmt_cores: Vec<usize>,
    pub socket_of: Vec<usize>,
    pub port_socket: Vec<usize>,
    pub port_workers: Vec<Vec<usize>>,
}

impl CoreMap {
    pub fn num_workers(&self) -> usize {
        self.worker_cores.len()
    }

    pub fn num_mgmt(&self) -> usize {
        self.mgmt_cores.len()
    }

    pub fn role_name(role: CoreRole) -> &'static str {
        match role {
            CoreRole::Idle => "idle",
            CoreRole::Worker => "worker",
            CoreRole::PrimaryMgmt => "primary-mgmt",
            CoreRole::Telemetry => "telemetry",
            CoreRole::CliApi => "cli-api",
            CoreRole::Watchdog => "watchdog",
        }
    }
}

/// `socket_of_core` is a caller-supplied NUMA lookup (real topology on a
/// real machine; a constant-zero closure on the soft-NIC backend this
/// crate targets, since there is exactly one socket to reason about).
pub fn assign(
    n_cores: usize,
    mode: AssignMode,
    n_ports: usize,
    socket_of_core: impl Fn(usize) -> usize,
    socket_of_port: impl Fn(usize) -> usize,
) -> Result<CoreMap, ResourceError> {
    if n_cores < 2 {
        return Err(ResourceError::InsufficientCores { available: n_cores });
    }

    let socket_of: Vec<usize> = (0..n_cores).map(&socket_of_core).collect();

    let (n_mgmt, mgmt_roles): (usize, Vec<CoreRole>) = match mode {
        AssignMode::Auto => {
            let tier = select_tier(n_cores);
            (tier.mgmt_roles.len(), tier.mgmt_roles.to_vec())
        }
        AssignMode::Manual { num_mgmt, .. } => {
            let n = num_mgmt.clamp(1, MAX_MGMT_CORES);
            let tier = select_tier(n_cores);
            let mut roles = tier.mgmt_roles.to_vec();
            roles.resize(n, CoreRole::PrimaryMgmt);
            (n, roles)
        }
    };

    let n_workers = match mode {
        AssignMode::Auto => n_cores - n_mgmt,
        AssignMode::Manual { num_workers, .. } => num_workers,
    };
    if n_workers == 0 {
        return Err(ResourceError::NoWorkerCores { n_cores, n_mgmt });
    }
    if n_mgmt + n_workers > n_cores {
        return Err(ResourceError::InconsistentManualAssignment {
            requested: n_mgmt + n_workers,
            available: n_cores,
        });
    }

    let mut role = vec![CoreRole::Idle; n_cores];
    let mut mgmt_cores = Vec::with_capacity(n_mgmt);

    // Pass 1: management roles, prefer socket 0.
    for core in 0..n_cores {
        if mgmt_cores.len() >= n_mgmt {
            break;
        }
        if socket_of[core] != 0 {
            continue;
        }
        role[core] = mgmt_roles[mgmt_cores.len()];
        mgmt_cores.push(core);
    }
    // Pass 1b: fill remaining management roles from any socket.
    if mgmt_cores.len() < n_mgmt {
        for core in 0..n_cores {
            if mgmt_cores.len() >= n_mgmt {
                break;
            }
            if role[core] != CoreRole::Idle {
                continue;
            }
            role[core] = mgmt_roles[mgmt_cores.len()];
            mgmt_cores.push(core);
        }
    }
    // Pass 2: workers claim the remainder.
    let mut worker_cores = Vec::with_capacity(n_workers);
    for core in 0..n_cores {
        if worker_cores.len() >= n_workers {
            break;
        }
        if role[core] != CoreRole::Idle {
            continue;
        }
        role[core] = CoreRole::Worker;
        worker_cores.push(core);
    }

    let port_socket: Vec<usize> = (0..n_ports).map(&socket_of_port).collect();
    let mut port_workers = vec![Vec::new(); n_ports];
    for &w in &worker_cores {
        let wsocket = socket_of[w];
        for p in 0..n_ports {
            if port_socket[p] == wsocket {
                port_workers[p].push(w);
            }
        }
    }
    // Any port with no same-socket worker falls back to every worker.
    for p in 0..n_ports {
        if port_workers[p].is_empty() {
            port_workers[p] = worker_cores.clone();
        }
    }

    let map = CoreMap {
        role,
        worker_cores,
        mgmt_cores,
        socket_of,
        port_socket,
        port_workers,
    };
    log_assignment(&map);
    Ok(map)
}

fn log_assignment(map: &CoreMap) {
    log::info!(
        "core assignment: {} worker(s), {} management core(s)",
        map.num_workers(),
        map.num_mgmt()
    );
    for (i, &c) in map.worker_cores.iter().enumerate() {
        log::info!("  worker[{i}] core={c} socket={}", map.socket_of[c]);
    }
    for (i, &c) in map.mgmt_cores.iter().enumerate() {
        log::info!(
            "  mgmt[{i}] core={c} socket={} role={}",
            map.socket_of[c],
            CoreMap::role_name(map.role[c])
        );
    }
}
