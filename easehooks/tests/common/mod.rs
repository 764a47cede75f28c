#![allow(dead_code)]

use easehooks::mock::MockTransport;
use easehooks::{BatteryData, Request, Response};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn todo() -> Value {
    json!({
        "userId": 1,
        "id": 1,
        "title": "delectus aut autem",
        "completed": false
    })
}

pub fn transport() -> Arc<MockTransport> {
    Arc::new(MockTransport::new())
}

/// A transport that echoes the requested URL back as `{"url": ...}`.
pub fn echo_transport() -> Arc<MockTransport> {
    let transport = transport();
    transport.mock_with(|request: &Request| Ok(Response::json(200, &json!({ "url": request.url }))));
    transport
}

pub fn battery_reading(level: f64) -> BatteryData {
    BatteryData {
        charging: true,
        charging_time: 1200.0,
        discharging_time: f64::INFINITY,
        level,
    }
}
