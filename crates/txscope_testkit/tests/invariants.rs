//! Random operation sequences checked against the state model.

use proptest::prelude::*;
use txscope_testkit::prelude::*;

fn assert_consistent<S: Session>(session: &S, db: &MemoryDatabase) {
    if session.transaction().is_some() {
        assert!(session.connection().is_some(), "transaction without connection");
    }
    let expected_live = u64::from(session.connection().is_some());
    assert_eq!(db.stats().live_connections, expected_live);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn blocking_sequences_follow_the_model(
        options in arb_options(),
        operations in arb_operations(24),
    ) {
        let db = MemoryDatabase::new();
        let mut uow = UnitOfWork::with_options(db.connection_factory(), options);

        for operation in operations {
            let before = uow.state();
            let expected = expected_transition(before, operation, &options);
            let outcome = operation.apply(&mut uow);

            match expected {
                Ok(state) => {
                    prop_assert!(
                        outcome.is_ok(),
                        "{operation:?} from {before:?} failed: {outcome:?}"
                    );
                    prop_assert_eq!(uow.state(), state);
                }
                Err(violation) => {
                    let err = outcome.expect_err("state violation expected");
                    prop_assert_eq!(err.state_violation(), Some(violation));
                    prop_assert_eq!(uow.state(), before);
                }
            }
            assert_consistent(&uow, &db);
        }

        uow.dispose();
        prop_assert_eq!(db.stats().live_connections, 0);
    }

    #[test]
    fn async_sequences_follow_the_model(
        options in arb_options(),
        operations in arb_operations(24),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let db = MemoryDatabase::new();
            let mut uow = AsyncUnitOfWork::with_options(db.connection_factory(), options);

            for operation in operations {
                let before = uow.state();
                let expected = expected_transition(before, operation, &options);
                let outcome = operation.apply_async(&mut uow).await;

                match expected {
                    Ok(state) => {
                        assert!(
                            outcome.is_ok(),
                            "{operation:?} from {before:?} failed: {outcome:?}"
                        );
                        assert_eq!(uow.state(), state);
                    }
                    Err(violation) => {
                        assert_eq!(outcome.map_err(|e| e.state_violation()), Err(Some(violation)));
                        assert_eq!(uow.state(), before);
                    }
                }
                assert_consistent(&uow, &db);
            }

            uow.dispose().await;
            assert_eq!(db.stats().live_connections, 0);
        });
    }

    #[test]
    fn faults_never_break_the_invariant(
        operations in arb_operations(24),
        faults in prop::collection::vec(
            prop_oneof![
                Just(DriverOperation::Open),
                Just(DriverOperation::Close),
                Just(DriverOperation::BeginTransaction),
                Just(DriverOperation::Commit),
                Just(DriverOperation::Rollback),
            ],
            0..24,
        ),
    ) {
        let db = MemoryDatabase::new();
        let mut uow =
            UnitOfWork::with_options(db.connection_factory(), UnitOfWorkOptions::lenient());

        for (index, operation) in operations.into_iter().enumerate() {
            if let Some(fault) = faults.get(index) {
                db.inject_fault(*fault);
            }
            let before = uow.state();
            // A failed close still releases the connection.
            if let Err(err) = operation.apply(&mut uow) {
                if err.driver_operation() != Some(DriverOperation::Close) {
                    prop_assert_eq!(uow.state(), before);
                }
            }
            prop_assert!(uow.transaction().is_none() || uow.connection().is_some());
        }
    }
}
