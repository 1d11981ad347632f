//! The Prometheus exporter serves the registry over HTTP.

use hermes_telemetry::{init_metrics, render_metrics, MetricRegistry, MetricsConfig};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn scrape(port: u16) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream
        .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

#[test]
fn listener_serves_registry_and_second_init_keeps_it() {
    let port = free_port();
    let config = MetricsConfig {
        addr: format!("127.0.0.1:{port}"),
        ..MetricsConfig::default()
    };

    init_metrics(&config).unwrap();
    init_metrics(&MetricsConfig {
        addr: "127.0.0.1:1".to_string(),
        ..MetricsConfig::default()
    })
    .unwrap();

    let registry = MetricRegistry::new();
    registry.meter("com.example.Svc.call").mark_n(3);

    let rendered = render_metrics().unwrap();
    assert!(rendered.contains("com_example_Svc_call_total 3"));

    let response = scrape(port);
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("com_example_Svc_call_total 3"));
}
