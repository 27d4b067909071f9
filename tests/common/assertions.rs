//! Custom assertion utilities for tests.

use sui_ptb_composer::types::{Argument, ProgrammableTransaction};

/// Assert that a result is Ok and return the inner value.
#[allow(dead_code)]
pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("{} failed: {:?}", context, e),
    }
}

/// Assert that an error message contains expected text (case-insensitive).
#[allow(dead_code)]
pub fn assert_error_contains<E: std::fmt::Display>(error: E, expected_text: &str, context: &str) {
    let error_str = error.to_string().to_lowercase();
    let expected_lower = expected_text.to_lowercase();

    assert!(
        error_str.contains(&expected_lower),
        "{}: error message should contain '{}', got: {}",
        context,
        expected_text,
        error
    );
}

/// Assert that every command only consumes results of commands before it.
#[allow(dead_code)]
pub fn assert_dependencies_ordered(ptb: &ProgrammableTransaction) {
    for (idx, command) in ptb.commands.iter().enumerate() {
        for arg in command.arguments() {
            if let Some(dep) = arg.command_index() {
                assert!(
                    (dep as usize) < idx,
                    "command {} depends on command {} ({:?})",
                    idx,
                    dep,
                    arg
                );
            }
            if let Argument::Input(input) = arg {
                assert!(
                    (*input as usize) < ptb.inputs.len(),
                    "command {} references missing input {}",
                    idx,
                    input
                );
            }
        }
    }
}
