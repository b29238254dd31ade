mod common;

use carelink_core::{fold_balance, EntryReason};
use carelink_engine::{EngineError, Movement};
use common::{harness, user, AnchorBehavior, FAMILY};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Credit(u64),
    Debit(u64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..=500).prop_map(Op::Credit),
        (1u64..=500).prop_map(Op::Debit),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Balance always equals the fold of the account's entries and a debit
    /// that would overdraw writes nothing.
    #[test]
    fn prop_balance_is_the_fold_and_never_negative(
        ops in prop::collection::vec(arb_op(), 0..40),
    ) {
        let rt = runtime();
        let h = harness(AnchorBehavior::Accept);
        let family = user(FAMILY);
        let mut expected: u64 = 0;

        for (i, op) in ops.iter().enumerate() {
            match *op {
                Op::Credit(amount) => {
                    rt.block_on(h.ledger.credit(
                        &family,
                        Movement::new(amount, EntryReason::Purchase, format!("op-{}", i)),
                    ))
                    .unwrap();
                    expected += amount;
                }
                Op::Debit(amount) => {
                    let result = rt.block_on(h.ledger.debit(
                        &family,
                        Movement::new(amount, EntryReason::Redemption, format!("op-{}", i)),
                    ));
                    if amount > expected {
                        let rejected = matches!(
                            result,
                            Err(EngineError::InsufficientBalance { balance, requested, .. })
                                if balance == expected && requested == amount
                        );
                        prop_assert!(rejected);
                    } else {
                        prop_assert!(result.is_ok());
                        expected -= amount;
                    }
                }
            }
            prop_assert_eq!(rt.block_on(h.ledger.balance(&family)).unwrap(), expected);
        }

        let history = rt.block_on(h.ledger.history(&family)).unwrap();
        prop_assert_eq!(fold_balance(&history), i128::from(expected));
        for prefix in 0..=history.len() {
            prop_assert!(fold_balance(&history[..prefix]) >= 0);
        }
        prop_assert_eq!(h.ledger.supply().unwrap().circulating(), expected);
    }
}
