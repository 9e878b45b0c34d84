// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! The `on:` block of a compiled workflow

use serde_yaml::{Mapping, Value};

use crate::workflow::{TriggerEvent, WorkflowIr};

/// Events a slash command listens on when none are listed
pub const DEFAULT_COMMAND_EVENTS: [TriggerEvent; 4] = [
    TriggerEvent::Issues,
    TriggerEvent::IssueComment,
    TriggerEvent::PullRequest,
    TriggerEvent::PullRequestReviewComment,
];

fn command_activity_types(event: TriggerEvent) -> &'static [&'static str] {
    match event {
        TriggerEvent::Issues | TriggerEvent::PullRequest => &["opened", "edited", "reopened"],
        _ => &["created", "edited"],
    }
}

/// Build the `on:` mapping.
///
/// Declared triggers come first, in declaration order, with their
/// configuration passed through. Command events that were not declared are
/// appended with the activity types a command can appear in.
pub fn build_triggers(ir: &WorkflowIr) -> Mapping {
    let mut on = Mapping::new();

    for trigger in &ir.on {
        on.insert(
            Value::String(trigger.event.as_str().to_string()),
            trigger.config.clone(),
        );
    }

    if let Some(command) = &ir.command {
        let events: &[TriggerEvent] = if command.events.is_empty() {
            &DEFAULT_COMMAND_EVENTS
        } else {
            &command.events
        };

        for event in events {
            let key = Value::String(event.as_str().to_string());
            if on.contains_key(&key) {
                continue;
            }
            let types: Vec<Value> = command_activity_types(*event)
                .iter()
                .map(|t| Value::String(t.to_string()))
                .collect();
            let mut config = Mapping::new();
            config.insert(Value::String("types".into()), Value::Sequence(types));
            on.insert(key, Value::Mapping(config));
        }
    }

    on
}
