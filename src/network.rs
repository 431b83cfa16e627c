//! Pre-flight connectivity check.
//!
//! Before any networked operation starts, the hosts of the selected projects
//! are probed with a plain TCP connect. Projects served from `file://`
//! sources need no network and never cause the check to fail.

use std::collections::BTreeSet;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info};

use crate::manifest::ResolvedProject;
use crate::source::{Protocol, Source};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// `host:port` to probe for a source, or `None` for local sources.
fn endpoint(source: &Source) -> Option<String> {
    let port = match source.protocol {
        Protocol::Ssh => 22,
        Protocol::Https => 443,
        Protocol::File => return None,
    };
    let host = source.host.trim_end_matches('/');
    Some(format!("{}:{}", host, port))
}

fn reachable(endpoint: &str) -> bool {
    let addrs = match endpoint.to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            debug!("cannot resolve {}: {}", endpoint, e);
            return false;
        }
    };
    addrs
        .into_iter()
        .any(|addr| TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).is_ok())
}

/// Whether the remotes of `projects` look reachable.
///
/// Online means at least one remote host accepts a connection, or none of
/// the projects needs the network at all.
pub fn is_online(projects: &[ResolvedProject]) -> bool {
    let endpoints: BTreeSet<String> = projects
        .iter()
        .flat_map(|p| {
            let upstream = p.upstream.as_ref().map(|u| &u.source);
            std::iter::once(&p.source).chain(upstream)
        })
        .filter_map(endpoint)
        .collect();

    if endpoints.is_empty() {
        return true;
    }

    let online = endpoints.iter().any(|e| reachable(e));
    if !online {
        info!("none of {} remote hosts is reachable", endpoints.len());
    }
    online
}
