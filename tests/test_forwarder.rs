//! Forwarder tests against a mock OTLP/HTTP endpoint

use gcp_monitoring_receiver::config::{AuthConfig, ForwardingConfig};
use gcp_monitoring_receiver::error::ExportError;
use gcp_monitoring_receiver::otlp::{
    Gauge, InstrumentationScope, MetricData, MetricNode, MetricsDocument, NumberDataPoint,
    NumberValue, OtlpForwarder, ResourceNode, ScopeNode,
};
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use prost::Message;
use secrecy::SecretString;
use std::collections::HashMap;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn document() -> MetricsDocument {
    let mut resource = ResourceNode::default();
    resource.put_attribute("gcp.resource_type", "gce_instance");
    resource.scope_metrics.push(ScopeNode {
        scope: InstrumentationScope::receiver(),
        metrics: vec![MetricNode {
            name: "compute.googleapis.com/instance/cpu/utilization".to_string(),
            description: "CPU utilization".to_string(),
            unit: "10^2.%".to_string(),
            data: Some(MetricData::Gauge(Gauge {
                data_points: vec![NumberDataPoint {
                    attributes: vec![],
                    start_time_unix_nano: None,
                    time_unix_nano: 1_714_564_680_000_000_000,
                    value: NumberValue::AsDouble(0.42),
                }],
            })),
        }],
    });
    MetricsDocument {
        resource_metrics: vec![resource],
    }
}

fn forwarding(server: &MockServer, authentication: Option<AuthConfig>) -> ForwardingConfig {
    ForwardingConfig {
        enabled: true,
        endpoint_url: Some(server.uri()),
        authentication,
    }
}

#[tokio::test]
async fn test_forward_posts_protobuf_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/metrics"))
        .and(header("content-type", "application/x-protobuf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let forwarder = OtlpForwarder::new(forwarding(&server, None)).unwrap();
    forwarder.forward_metrics(&document()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let request = ExportMetricsServiceRequest::decode(requests[0].body.as_slice()).unwrap();
    assert_eq!(request.resource_metrics.len(), 1);
    let metric = &request.resource_metrics[0].scope_metrics[0].metrics[0];
    assert_eq!(metric.name, "compute.googleapis.com/instance/cpu/utilization");
}

#[tokio::test]
async fn test_forward_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/metrics"))
        .and(header("authorization", "Bearer otlp-secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut credentials = HashMap::new();
    credentials.insert("token".to_string(), SecretString::new("otlp-secret".to_string()));
    let auth = AuthConfig {
        auth_type: "bearer_token".to_string(),
        credentials,
    };

    let forwarder = OtlpForwarder::new(forwarding(&server, Some(auth))).unwrap();
    forwarder.forward_metrics(&document()).await.unwrap();
}

#[tokio::test]
async fn test_empty_document_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let forwarder = OtlpForwarder::new(forwarding(&server, None)).unwrap();
    forwarder
        .forward_metrics(&MetricsDocument::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_repeated_failures_open_circuit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/metrics"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&server)
        .await;

    let forwarder = OtlpForwarder::new(forwarding(&server, None)).unwrap();

    for _ in 0..5 {
        assert!(matches!(
            forwarder.forward_metrics(&document()).await,
            Err(ExportError::ForwardingError(_))
        ));
    }

    // Rejected locally, the endpoint sees no sixth request
    assert!(matches!(
        forwarder.forward_metrics(&document()).await,
        Err(ExportError::CircuitOpen(_))
    ));
}
