//! Property tests for history ordering
//!
//! Random sequences of record/answer/abandon operations, checked against
//! the alternation invariants of the requests built from the log.

use super::history::{History, Role};
use crate::llm::MessageRole;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    User(String),
    Model(String),
    Abandon,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[a-z ]{1,12}".prop_map(Op::User),
        "[a-z ]{1,12}".prop_map(Op::Model),
        Just(Op::Abandon),
    ]
}

proptest! {
    #[test]
    fn prop_requests_always_alternate(ops in proptest::collection::vec(arb_op(), 0..60)) {
        let mut history = History::new();
        let mut accepted_users = 0usize;

        for op in ops {
            let before = history.len();
            match op {
                Op::User(text) => {
                    if history.push_user(text).is_ok() {
                        accepted_users += 1;
                    } else {
                        prop_assert_eq!(history.len(), before, "rejected push changed the log");
                    }
                }
                Op::Model(text) => {
                    if history.push_model(text).is_err() {
                        prop_assert_eq!(history.len(), before, "rejected push changed the log");
                    }
                }
                Op::Abandon => {
                    let _ = history.mark_unanswered();
                    prop_assert_eq!(history.len(), before);
                }
            }

            let messages = history.request_messages();
            for (i, message) in messages.iter().enumerate() {
                let expected = if i % 2 == 0 { MessageRole::User } else { MessageRole::Model };
                prop_assert_eq!(message.role, expected, "request out of alternation at {}", i);
            }
        }

        let users = history.turns().filter(|t| t.role() == Role::User).count();
        prop_assert_eq!(users, accepted_users);

        // Every model turn directly answers the user turn before it
        let turns: Vec<_> = history.turns().collect();
        for (i, turn) in turns.iter().enumerate() {
            if turn.role() == Role::Model {
                prop_assert!(i > 0);
                prop_assert_eq!(turns[i - 1].role(), Role::User);
            }
        }
    }

    #[test]
    fn prop_unanswered_turns_never_resent(questions in proptest::collection::vec(("[a-z]{1,8}", any::<bool>()), 1..20)) {
        let mut history = History::new();
        for (question, answered) in &questions {
            history.push_user(question.clone()).unwrap();
            if *answered {
                history.push_model(format!("answer to {question}")).unwrap();
            } else {
                history.mark_unanswered().unwrap();
            }
        }

        let expected_len = questions.iter().filter(|(_, answered)| *answered).count() * 2;
        prop_assert_eq!(history.request_messages().len(), expected_len);
        prop_assert_eq!(
            history.unanswered_count(),
            questions.iter().filter(|(_, answered)| !answered).count()
        );
    }
}
