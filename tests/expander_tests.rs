//! Offramp execute expansion tests.
//!
//! Covers the splice layout for the reference scenarios, the `2 + N + R`
//! command count, receiver filtering and lookup failures.

mod common;

use common::fixtures::{
    self, message, offramp_client, receiver, report, token, CCIP_OBJECT_REF, RECEIVER_PACKAGE,
    SOURCE_CHAIN_SELECTOR,
};
use common::{assert_error_contains, MockPtbClient};
use serde_json::json;
use sui_ptb_composer::offramp::{execute_template, get_address_mappings, OFFRAMP_MODULE};
use sui_ptb_composer::{
    CallContext, CommandTemplate, ExecutionReport, Expansion, ObjectPage, OffRampAddressMappings,
    OffRampExpander, PtbErrorKind, PtbResult,
};

async fn mappings(client: &MockPtbClient) -> OffRampAddressMappings {
    get_address_mappings(&CallContext::new(), client, "0x0", fixtures::OFFRAMP_PACKAGE)
        .await
        .expect("address mappings")
}

async fn expand(
    client: &MockPtbClient,
    report: &ExecutionReport,
    fixed: &[CommandTemplate],
) -> PtbResult<Expansion> {
    let mappings = mappings(client).await;
    OffRampExpander::new(client, &mappings, "0x0")
        .expand(&CallContext::new(), report, fixed)
        .await
}

fn functions(expansion: &Expansion) -> Vec<&str> {
    expansion
        .commands
        .iter()
        .map(|c| c.function.as_deref().unwrap_or_default())
        .collect()
}

fn finish_dependency(expansion: &Expansion) -> u16 {
    let finish = expansion.commands.last().expect("finish command");
    finish
        .params
        .iter()
        .find_map(|p| p.dependency)
        .expect("finish_execute dependency")
        .command_index
}

// =============================================================================
// Reference scenarios
// =============================================================================

#[tokio::test]
async fn test_single_token_without_receiver() {
    let client = offramp_client(1);
    let report = report(vec![message("", "", vec![token(0)])]);

    let expansion = expand(&client, &report, &execute_template().ptb_commands)
        .await
        .unwrap();

    assert_eq!(
        functions(&expansion),
        vec!["init_execute", "release_or_mint", "finish_execute"]
    );
    assert_eq!(finish_dependency(&expansion), 1);
    assert_eq!(client.calls_to("is_registered_receiver"), 0);
}

#[tokio::test]
async fn test_empty_report_keeps_bracket() {
    let client = offramp_client(0);
    let report = report(vec![]);

    let expansion = expand(&client, &report, &execute_template().ptb_commands)
        .await
        .unwrap();

    assert_eq!(functions(&expansion), vec!["init_execute", "finish_execute"]);
    assert_eq!(finish_dependency(&expansion), 0);
    assert_eq!(client.calls_to("get_pool_infos"), 0);
}

#[tokio::test]
async fn test_two_tokens_and_registered_receiver() {
    let client = offramp_client(2).with_registered_receiver(RECEIVER_PACKAGE);
    let report = report(vec![message(
        &receiver("ccip_receive"),
        "0x1234",
        vec![token(0), token(1)],
    )]);

    let expansion = expand(&client, &report, &execute_template().ptb_commands)
        .await
        .unwrap();

    assert_eq!(
        functions(&expansion),
        vec![
            "init_execute",
            "release_or_mint",
            "release_or_mint",
            "ccip_receive",
            "finish_execute"
        ]
    );
    for (idx, command) in expansion.commands.iter().enumerate().skip(1) {
        let dep = command
            .params
            .iter()
            .find_map(|p| p.dependency)
            .unwrap_or_else(|| panic!("command {idx} has no dependency"));
        assert_eq!(dep.command_index as usize, idx - 1, "command {idx}");
    }

    let receiver_call = &expansion.commands[3];
    assert_eq!(receiver_call.package_id.as_deref(), Some(RECEIVER_PACKAGE));
    assert_eq!(receiver_call.module_id.as_deref(), Some("ccip_receiver"));
    assert_eq!(
        expansion.arguments.get("package_id_3"),
        Some(&json!(RECEIVER_PACKAGE))
    );
}

#[tokio::test]
async fn test_three_command_template_is_rejected() {
    let client = offramp_client(1);
    let report = report(vec![message("", "", vec![token(0)])]);
    let mut fixed = execute_template().ptb_commands;
    fixed.insert(1, fixed[0].clone());

    let err = expand(&client, &report, &fixed).await.unwrap_err();

    assert_eq!(err.kind(), PtbErrorKind::TemplateShapeError);
    assert_error_contains(&err, "expected 2", "shape error");
    assert_eq!(client.calls_to("get_pool_infos"), 0);
}

// =============================================================================
// Expansion arithmetic
// =============================================================================

#[tokio::test]
async fn test_command_count_is_two_plus_tokens_plus_receivers() {
    // (tokens per message, receiver registered, payload present)
    let cases: Vec<Vec<(usize, bool, bool)>> = vec![
        vec![],
        vec![(0, true, true)],
        vec![(3, false, false)],
        vec![(1, true, true), (2, false, true), (0, true, false)],
        vec![(2, true, true), (1, true, true)],
    ];

    for (case_idx, case) in cases.into_iter().enumerate() {
        let mut client = offramp_client(8);
        let mut messages = Vec::new();
        let mut next_token = 0;
        let mut expected_receivers = 0;

        for (msg_idx, (tokens, registered, payload)) in case.iter().enumerate() {
            let package = format!("0x7{msg_idx}");
            if *registered {
                client = client.with_registered_receiver(&package);
            }
            if *registered && *payload {
                expected_receivers += 1;
            }
            let tokens = (0..*tokens)
                .map(|_| {
                    next_token += 1;
                    token(next_token - 1)
                })
                .collect();
            messages.push(message(
                &format!("{package}::receiver::ccip_receive"),
                if *payload { "0xab" } else { "0x" },
                tokens,
            ));
        }

        let expansion = expand(&client, &report(messages), &execute_template().ptb_commands)
            .await
            .unwrap();
        let dynamic = next_token + expected_receivers;
        assert_eq!(expansion.commands.len(), 2 + dynamic, "case {case_idx}");
        assert_eq!(finish_dependency(&expansion) as usize, dynamic, "case {case_idx}");
    }
}

// =============================================================================
// Pools and receivers
// =============================================================================

#[tokio::test]
async fn test_pool_lookup_is_one_batched_call() {
    let client = offramp_client(3);
    let report = report(vec![
        message("", "", vec![token(2), token(0)]),
        message("", "", vec![token(1)]),
    ]);

    let expansion = expand(&client, &report, &execute_template().ptb_commands)
        .await
        .unwrap();

    let lookups: Vec<_> = client
        .calls()
        .into_iter()
        .filter(|c| c.function == "get_pool_infos")
        .collect();
    assert_eq!(lookups.len(), 1);
    assert_eq!(lookups[0].args[0], json!(CCIP_OBJECT_REF));
    assert_eq!(lookups[0].args[1], json!(["0xa2", "0xa0", "0xa1"]));
    assert_eq!(lookups[0].arg_types, vec!["object_id", "vector<address>"]);

    // Pools follow token order across messages.
    let args = &expansion.arguments;
    assert_eq!(args.get("pool_1"), Some(&json!("0xe2")));
    assert_eq!(args.get("pool_2"), Some(&json!("0xe0")));
    assert_eq!(args.get("pool_3"), Some(&json!("0xe1")));
    assert_eq!(args.get("index_3"), Some(&json!(2)));
    assert_eq!(args.type_hints.get("pool_1").map(String::as_str), Some("0xb2::token::TOKEN"));
    assert_eq!(
        args.get("remote_chain_selector"),
        Some(&json!(SOURCE_CHAIN_SELECTOR))
    );
    assert_eq!(expansion.commands[1].package_id.as_deref(), Some("0xd2"));
}

#[tokio::test]
async fn test_unregistered_receiver_is_skipped() {
    let client = offramp_client(1);
    let report = report(vec![message(
        &receiver("ccip_receive"),
        "0x1234",
        vec![token(0)],
    )]);

    let expansion = expand(&client, &report, &execute_template().ptb_commands)
        .await
        .unwrap();

    assert_eq!(expansion.commands.len(), 3);
    assert_eq!(client.calls_to("is_registered_receiver"), 1);
    assert!(expansion.arguments.get("package_id_2").is_none());
}

#[tokio::test]
async fn test_receiver_without_payload_is_not_called() {
    let client = offramp_client(0).with_registered_receiver(RECEIVER_PACKAGE);
    let report = report(vec![message(&receiver("ccip_receive"), "", vec![])]);

    let expansion = expand(&client, &report, &execute_template().ptb_commands)
        .await
        .unwrap();

    assert_eq!(expansion.commands.len(), 2);
    assert_eq!(client.calls_to("is_registered_receiver"), 0);
}

#[tokio::test]
async fn test_malformed_receiver_fails_before_lookup() {
    let client = offramp_client(0).with_registered_receiver(RECEIVER_PACKAGE);
    let report = report(vec![message("0x99::ccip_receive", "0x1234", vec![])]);

    let err = expand(&client, &report, &execute_template().ptb_commands)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), PtbErrorKind::InvalidParameterShape);
    assert_error_contains(&err, "package::module::function", "malformed receiver");
    assert_eq!(client.calls_to("is_registered_receiver"), 0);
}

#[tokio::test]
async fn test_unknown_pool_is_lookup_error() {
    let client = offramp_client(1);
    let report = report(vec![message("", "", vec![token(5)])]);

    let err = expand(&client, &report, &execute_template().ptb_commands)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), PtbErrorKind::ExternalLookupError);
    assert_error_contains(&err, "get_pool_infos", "pool lookup failure");
}

#[tokio::test]
async fn test_registry_failure_is_lookup_error() {
    let client = offramp_client(0).with_failure("receiver_registry", "is_registered_receiver");
    let report = report(vec![message(&receiver("ccip_receive"), "0x01", vec![])]);

    let err = expand(&client, &report, &execute_template().ptb_commands)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), PtbErrorKind::ExternalLookupError);
}

// =============================================================================
// Address mappings
// =============================================================================

#[tokio::test]
async fn test_address_mappings_discovery() {
    let client = offramp_client(0);
    let mappings = mappings(&client).await;

    assert_eq!(mappings.ccip_package_id, fixtures::CCIP_PACKAGE);
    assert_eq!(mappings.ccip_object_ref, CCIP_OBJECT_REF);
    assert_eq!(mappings.ccip_owner_cap, fixtures::CCIP_OWNER_CAP);
    assert_eq!(mappings.offramp_state, fixtures::OFFRAMP_STATE);
    assert_eq!(mappings.clock_object, "0x6");

    let first = &client.calls()[0];
    assert_eq!(first.module, OFFRAMP_MODULE);
    assert_eq!(first.function, "get_ccip_package_id");
}

#[tokio::test]
async fn test_address_mappings_missing_pointer() {
    let client = MockPtbClient::new().with_response(
        "offramp",
        "get_ccip_package_id",
        json!([fixtures::CCIP_PACKAGE]),
    );

    let err = get_address_mappings(&CallContext::new(), &client, "0x0", fixtures::OFFRAMP_PACKAGE)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), PtbErrorKind::ExternalLookupError);
    assert_error_contains(&err, "offramp_state", "missing pointer");
}

#[tokio::test]
async fn test_address_mappings_cursor_cycle_terminates() {
    let client = MockPtbClient::new()
        .with_response("offramp", "get_ccip_package_id", json!([fixtures::CCIP_PACKAGE]))
        .with_owned_pages(
            fixtures::OFFRAMP_PACKAGE,
            vec![ObjectPage {
                data: vec![],
                next_cursor: Some("0".to_string()),
            }],
        );

    let err = get_address_mappings(&CallContext::new(), &client, "0x0", fixtures::OFFRAMP_PACKAGE)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), PtbErrorKind::ExternalLookupError);
    assert_error_contains(&err, "offramp_state", "cycling cursor");
}
