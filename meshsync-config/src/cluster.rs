use meshsync_core::Node;
use tracing::warn;

use crate::error::{ConfigError, Result};

/// The ordered cluster membership parsed from `--cluster`, plus which
/// element is the local node.
#[derive(Debug, Clone)]
pub struct ClusterTopology {
    nodes: Vec<Node>,
    local_index: usize,
}

impl ClusterTopology {
    /// Parses a comma-separated list of `host:coord_port:file_port` triples.
    /// Malformed entries are logged and skipped (§7 "Malformed cluster
    /// config entry") rather than aborting startup; the local node is
    /// identified by matching `host`/`coord_port` against the ones actually
    /// parsed.
    pub fn parse(csv: &str, local_host: &str, local_coord_port: u16) -> Result<Self> {
        let nodes: Vec<Node> = csv
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| match Node::parse_triple(entry) {
                Ok(node) => Some(node),
                Err(err) => {
                    warn!(entry, %err, "skipping malformed cluster config entry");
                    None
                }
            })
            .collect();

        if nodes.is_empty() {
            return Err(ConfigError::EmptyCluster);
        }

        let local_index = nodes
            .iter()
            .position(|node| node.matches(local_host, local_coord_port))
            .ok_or_else(|| ConfigError::LocalNodeNotInCluster {
                host: local_host.to_string(),
                coord_port: local_coord_port,
            })?;

        Ok(Self { nodes, local_index })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn local_node(&self) -> &Node {
        &self.nodes[self.local_index]
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Every member except the local node — candidates for peer pulls.
    pub fn peers(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.local_index)
            .map(|(_, node)| node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_locates_local_node() {
        let topology = ClusterTopology::parse(
            "localhost:10001:8081,localhost:10002:8082,localhost:10003:8083",
            "localhost",
            10002,
        )
        .unwrap();
        assert_eq!(topology.size(), 3);
        assert_eq!(topology.local_node().file_port, 8082);
        assert_eq!(topology.peers().count(), 2);
    }

    #[test]
    fn skips_malformed_entries() {
        let topology = ClusterTopology::parse(
            "localhost:10001:8081,garbage,localhost:10002:8082",
            "localhost",
            10001,
        )
        .unwrap();
        assert_eq!(topology.size(), 2);
    }

    #[test]
    fn errors_when_local_node_absent() {
        let result = ClusterTopology::parse("localhost:10001:8081", "localhost", 9999);
        assert!(matches!(result, Err(ConfigError::LocalNodeNotInCluster { .. })));
    }

    #[test]
    fn errors_on_empty_cluster() {
        let result = ClusterTopology::parse("", "localhost", 10001);
        assert!(matches!(result, Err(ConfigError::EmptyCluster)));
    }
}
