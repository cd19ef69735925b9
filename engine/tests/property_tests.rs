use proptest::prelude::*;

use genesis_engine::agent::{classify_reply, parse_decision, Conversation, TaskStatus};
use genesis_engine::llm::router::RoutingTier;
use genesis_engine::llm::MessageRole;

// Conversation length stays bounded and the system message never moves
proptest! {
    #[test]
    fn test_pruning_keeps_system_message_and_bound(
        tail in 1usize..20,
        extra in 1usize..20,
        pushes in 0usize..200,
    ) {
        let ceiling = tail + extra;
        let mut conversation = Conversation::with_limits("system", ceiling, tail).unwrap();

        for i in 0..pushes {
            if i % 2 == 0 {
                conversation.push_user(format!("user {}", i));
            } else {
                conversation.push_assistant(format!("assistant {}", i));
            }

            prop_assert!(conversation.len() <= ceiling);
            prop_assert_eq!(conversation.messages()[0].role, MessageRole::System);
            prop_assert_eq!(conversation.messages()[0].content.as_str(), "system");
        }

        // The newest message always survives pruning
        if pushes > 0 {
            let last = conversation.messages().last().unwrap();
            let expected_suffix = format!(" {}", pushes - 1);
            prop_assert!(last.content.ends_with(&expected_suffix));
        }
    }

    #[test]
    fn test_pruned_history_keeps_most_recent_tail(pushes in 101usize..400) {
        let mut conversation = Conversation::new("system");
        for i in 0..pushes {
            conversation.push_user(format!("m{}", i));
        }

        let messages = conversation.messages();
        // After the most recent prune the history grows back from 1 + tail
        prop_assert!(messages.len() > conversation.tail());
        let contents: Vec<usize> = messages[1..]
            .iter()
            .map(|m| m.content[1..].parse().unwrap())
            .collect();
        for pair in contents.windows(2) {
            prop_assert_eq!(pair[0] + 1, pair[1]);
        }
        prop_assert_eq!(*contents.last().unwrap(), pushes - 1);
    }
}

// Routing tier depends only on the tool output marker
proptest! {
    #[test]
    fn test_tool_output_routes_fast(body in ".*") {
        let input = format!("Tool Output: {}", body);
        prop_assert_eq!(RoutingTier::for_input(&input), RoutingTier::Fast);
    }

    #[test]
    fn test_human_input_routes_smart(input in "[a-zA-Z0-9 ,.!?]{0,80}") {
        prop_assume!(!input.starts_with("Tool Output: "));
        prop_assert_eq!(RoutingTier::for_input(&input), RoutingTier::Smart);
    }
}

// Completion words take precedence over failure words
proptest! {
    #[test]
    fn test_completion_wins_over_failure(
        prefix in "[a-z ]{0,20}",
        suffix in "[a-z ]{0,20}",
        completion in "completed|done|DONE|Completed",
        failure in "failed|error|ERROR",
    ) {
        let reply = format!("{}{} {} {}", prefix, failure, completion, suffix);
        prop_assert_eq!(classify_reply(&reply), Some(TaskStatus::Completed));
    }

    #[test]
    fn test_parse_decision_never_panics(text in ".{0,200}") {
        let _ = parse_decision(&text);
    }
}
