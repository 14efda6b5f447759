//! End-to-end test against a real UDP collector socket.

use std::collections::BTreeMap;
use std::net::UdpSocket;
use std::time::Duration;

use statsd_sidecar::{Schedule, Sidecar, SinkConfig};

const CLUSTERED_SNAPSHOT: &str = r#"{
    "workers": 2,
    "booted_workers": 2,
    "worker_status": [
        { "last_status": { "running": 1, "backlog": 0, "pool_capacity": 4, "max_threads": 8 } },
        { "last_status": { "running": 2, "backlog": 1, "pool_capacity": 3, "max_threads": 8 } }
    ]
}"#;

#[test]
fn test_gauges_arrive_over_udp() {
    let _ = env_logger::builder().is_test(true).try_init();

    let collector = UdpSocket::bind("127.0.0.1:0").unwrap();
    collector
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let port = collector.local_addr().unwrap().port();

    let mut tags = BTreeMap::new();
    tags.insert("pod_name".into(), "web-0".into());
    let config = SinkConfig {
        host: "127.0.0.1".into(),
        port,
        prefix: "server".into(),
        tags,
    };
    let schedule = Schedule {
        initial_delay: Duration::from_millis(1),
        interval: Duration::from_millis(50),
    };

    let sidecar = Sidecar::new(config, schedule).unwrap();
    assert!(sidecar.enabled());
    let sampler = sidecar
        .start(|| -> std::io::Result<String> { Ok(CLUSTERED_SNAPSHOT.to_string()) })
        .expect("sidecar should start when a host is configured");

    let mut buf = [0u8; 1024];
    let mut datagrams = Vec::new();
    while datagrams.len() < 6 {
        let len = collector.recv(&mut buf).unwrap();
        datagrams.push(String::from_utf8_lossy(&buf[..len]).into_owned());
    }
    sampler.shutdown();

    assert_eq!(datagrams[0], "server.workers:2|g|#pod_name:web-0");
    assert_eq!(datagrams[1], "server.booted_workers:2|g|#pod_name:web-0");
    assert_eq!(datagrams[2], "server.backlog:1|g|#pod_name:web-0");
    assert_eq!(datagrams[3], "server.running:3|g|#pod_name:web-0");
    assert_eq!(datagrams[4], "server.pool_capacity:7|g|#pod_name:web-0");
    assert_eq!(datagrams[5], "server.max_threads:16|g|#pod_name:web-0");
}
