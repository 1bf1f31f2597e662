// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::api::AuthClient;

fn config_with_urls(g1g: &str, g1k: &str, g1l: &str) -> Config {
    Config::parse_from([
        "satwatch",
        "--telegram-token", "t",
        "--telegram-chat-id", "c",
        "--authorized-telegram-ids", "1",
        "--cron-schedule", "0 * * * * *",
        "--prtg-url", "p",
        "--prtg-api-token", "p",
        "--iptx-jyp", "1", "--iptx-mnk", "2", "--iptx-tmk", "3",
        "--nif-jyp", "4", "--nif-mnk", "5", "--nif-tmk", "6",
        "--g1g-url", g1g,
        "--g1k-url", g1k,
        "--g1l-url", g1l,
        "--api-email", "e",
        "--api-password", "s",
    ])
}

#[test]
fn url_resolution_per_gateway() {
    let config = config_with_urls("https://g1g", "https://g1k", "https://g1l");
    assert_eq!(
        gateway_urls(&config, Gateway::Jayapura),
        GatewayUrls { sensor: "https://g1g".into(), shared: "https://g1k".into() }
    );
    assert_eq!(
        gateway_urls(&config, Gateway::Manokwari),
        GatewayUrls { sensor: "https://g1k".into(), shared: "https://g1k".into() }
    );
    assert_eq!(
        gateway_urls(&config, Gateway::Timika),
        GatewayUrls { sensor: "https://g1l".into(), shared: "https://g1k".into() }
    );
}

async fn mount_ok(server: &MockServer, endpoint: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn full_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "data": {"token": "tok"}
        })))
        .mount(&server)
        .await;
    mount_ok(&server, "/api/v1/ipcn/status", json!({
        "ip_transit_main": {"statustext": "Up"},
        "ip_transit_backup_status": {"statustext": "Up"},
        "nif_status": {"statustext": "Up"},
        "nms_status": {"statustext": "Up"}
    }))
    .await;
    mount_ok(&server, "/api/v1/lnm/prtg-data/iptx-traffic", json!({
        "hisdata": [{"traffic_total_speed": 900.0}]
    }))
    .await;
    mount_ok(&server, "/api/v1/toa/range-interval", json!({
        "data": [{"ut_online_toa": 4321, "created_at": "2024-06-01T00:00:00Z"}]
    }))
    .await;
    mount_ok(&server, "/api/v1/ipcn/sensor-status", json!([
        {"device_name": "IPCN_MNK_CR1-G1K", "statustext_ping": "Up"}
    ]))
    .await;
    mount_ok(&server, "/api/v1/device_properties/status", json!({
        "data": [{
            "modulator": [{"nif_type": 1, "online": 4, "offline": 0}],
            "demodulator": [{"nif_type": 1, "online": 6, "offline": 1}]
        }]
    }))
    .await;
    mount_ok(&server, "/api/v1/terminal/beam-terminal-status", json!({
        "data": {"status_counts": {"online": 120, "offline": 7}}
    }))
    .await;
    mount_ok(&server, "/api/v1/terminal/status/total/integrated", json!({
        "data": {"total": 130, "online": 120, "offline": 10}
    }))
    .await;
    server
}

fn http() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn snapshot_degrades_per_field() {
    let server = full_server().await;
    // CN beacon deliberately broken: 7 of 8 reads succeed.
    Mock::given(method("GET"))
        .and(path("/api/v1/lnm/cn_beacon"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = AuthClient::new(http(), server.uri(), "e", "s");
    let urls = GatewayUrls { sensor: server.uri(), shared: server.uri() };
    let snapshot = fetch_gateway_data(&client, &urls, Gateway::Manokwari).await;

    assert!(snapshot.cn_beacon.is_none());
    assert!(snapshot.ipcn_status.is_some());
    assert!(snapshot.iptx_traffic.is_some());
    assert!(snapshot.online_ut.is_some());
    assert!(snapshot.ipcn_sensors.is_some());
    assert!(snapshot.device_props.is_some());
    assert!(snapshot.beam_status.is_some());
    assert!(snapshot.integrated.is_some());
    assert_eq!(snapshot.integrated.unwrap().data.total, 130);
}

#[tokio::test]
async fn iptx_fetch_returns_three_reads() {
    let server = full_server().await;
    mount_ok(&server, "/api/v1/lnm/cn_beacon", json!({"data": {"value": 1.0}})).await;

    let client = AuthClient::new(http(), server.uri(), "e", "s");
    let urls = GatewayUrls { sensor: server.uri(), shared: server.uri() };
    let (status, traffic, online_ut) = fetch_iptx_data(&client, &urls, Gateway::Jayapura).await;

    assert!(status.is_some());
    assert_eq!(traffic.unwrap().his_data[0].traffic_total_speed, 900.0);
    assert_eq!(online_ut.unwrap().data[0].ut_online_toa, 4321);
}
