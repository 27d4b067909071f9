//! Fixtures for the offramp scenarios.
//!
//! Addresses are short-form hex; the engine accepts them anywhere an address
//! is expected.

use serde_json::{json, Map, Value as JsonValue};
use sui_ptb_composer::offramp::{ExecuteReport, Message, TokenAmount};
use sui_ptb_composer::{Arguments, ExecutionReport, ObjectPage, OwnedObject};

use super::mocks::{MockPool, MockPtbClient};

pub const OFFRAMP_PACKAGE: &str = "0xf0";
pub const OFFRAMP_STATE: &str = "0xf1";
pub const CCIP_PACKAGE: &str = "0xcc";
pub const CCIP_OBJECT_REF: &str = "0xc1";
pub const CCIP_OWNER_CAP: &str = "0xc2";
pub const RECEIVER_PACKAGE: &str = "0x99";
pub const SOURCE_CHAIN_SELECTOR: u64 = 5_009_297_550_715_157_269;

pub fn owned_object(id: &str, object_type: &str, fields: JsonValue) -> OwnedObject {
    let fields: Map<String, JsonValue> = match fields {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    };
    OwnedObject {
        object_id: id.to_string(),
        object_type: object_type.to_string(),
        fields,
    }
}

pub fn single_page(data: Vec<OwnedObject>) -> Vec<ObjectPage> {
    vec![ObjectPage {
        data,
        next_cursor: None,
    }]
}

/// Pool for token `n`: metadata `0xa<n>`, package `0xd<n>`, state `0xe<n>`.
pub fn pool(n: usize) -> (String, MockPool) {
    (
        format!("0xa{n}"),
        MockPool {
            package: format!("0xd{n}"),
            state: format!("0xe{n}"),
            module: "burn_mint_token_pool".to_string(),
            token_type: format!("0xb{n}::token::TOKEN"),
        },
    )
}

/// A client that knows the offramp deployment and pools `0..pools`.
pub fn offramp_client(pools: usize) -> MockPtbClient {
    let mut client = MockPtbClient::new()
        .with_response("offramp", "get_ccip_package_id", json!([CCIP_PACKAGE]))
        .with_owned_pages(
            OFFRAMP_PACKAGE,
            single_page(vec![owned_object(
                "0xf2",
                "0xf0::offramp::OffRampStatePointer",
                json!({ "off_ramp_state_id": OFFRAMP_STATE }),
            )]),
        )
        .with_owned_pages(
            CCIP_PACKAGE,
            single_page(vec![owned_object(
                "0xc3",
                "0xcc::state_object::CCIPObjectRefPointer",
                json!({ "object_ref_id": CCIP_OBJECT_REF, "owner_cap_id": CCIP_OWNER_CAP }),
            )]),
        );
    for n in 0..pools {
        let (metadata, pool) = pool(n);
        client = client.with_pool(&metadata, pool);
    }
    client
}

pub fn token(n: usize) -> TokenAmount {
    TokenAmount {
        dest_token_address: format!("0xa{n}"),
        amount: "1000".to_string(),
        ..Default::default()
    }
}

pub fn message(receiver: &str, data: &str, tokens: Vec<TokenAmount>) -> Message {
    Message {
        receiver: receiver.to_string(),
        data: data.to_string(),
        token_amounts: tokens,
        ..Default::default()
    }
}

pub fn receiver(function: &str) -> String {
    format!("{RECEIVER_PACKAGE}::ccip_receiver::{function}")
}

pub fn report(messages: Vec<Message>) -> ExecutionReport {
    ExecutionReport {
        abstract_reports: vec![ExecuteReport {
            source_chain_selector: SOURCE_CHAIN_SELECTOR,
            messages,
            ..Default::default()
        }],
    }
}

/// Caller arguments for an execute build carrying `report`.
pub fn execute_arguments(report: &ExecutionReport) -> Arguments {
    Arguments::new()
        .with_value("info", serde_json::to_value(report).unwrap())
        .with_value("report_context", json!(["0x01", "0x02"]))
        .with_value("report", "0xdeadbeef")
}
