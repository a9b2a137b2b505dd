use std::path::PathBuf;

use clap::Parser;

/// Command line arguments for the meshsync daemon.
#[derive(Parser, Debug)]
#[command(name = "meshsync")]
#[command(about = "Peer-to-peer eventually-consistent file mirror")]
pub struct Args {
    /// Directory to keep in sync.
    pub path: PathBuf,

    /// Own bind host.
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Port the file-serving endpoint listens on.
    #[arg(long)]
    pub file_server_port: u16,

    /// Port the coordination layer listens on.
    #[arg(long)]
    pub cluster_port: u16,

    /// Comma-separated `host:coord_port:file_port` triples, one per cluster
    /// member including self.
    #[arg(long)]
    pub cluster: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_required_and_defaulted_flags() {
        let args = Args::parse_from([
            "meshsync",
            "/srv/shared",
            "--file-server-port",
            "8081",
            "--cluster-port",
            "10001",
            "--cluster",
            "localhost:10001:8081",
        ]);
        assert_eq!(args.path, PathBuf::from("/srv/shared"));
        assert_eq!(args.host, "localhost");
        assert_eq!(args.file_server_port, 8081);
        assert_eq!(args.cluster_port, 10001);
    }

    #[test]
    fn rejects_missing_required_flags() {
        let result = Args::try_parse_from(["meshsync", "/srv/shared"]);
        assert!(result.is_err());
    }
}
