use speculate2::speculate;

speculate! {
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use docmodel::{
        Bootstrap, BootstrapConfig, BootstrapError, BootstrapState, Connector, LoadError,
        ModelSource, SqliteConnector, StoreError, StoreSession,
    };
    use docmodel_core::db::{Database, SyncReport};
    use docmodel_core::schema::{Catalog, CompiledModel, FieldOptions};
    use docmodel_core::SchemaDocument;

    #[derive(Clone, Default)]
    struct Calls {
        connects: Arc<AtomicUsize>,
        registered: Arc<Mutex<Vec<String>>>,
        syncs: Arc<AtomicUsize>,
    }

    impl Calls {
        fn connects(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }

        fn registered(&self) -> Vec<String> {
            self.registered.lock().unwrap().clone()
        }

        fn syncs(&self) -> usize {
            self.syncs.load(Ordering::SeqCst)
        }
    }

    /// Fails the first `failures` connection attempts.
    struct MockConnector {
        failures: usize,
        transient: bool,
        calls: Calls,
    }

    impl MockConnector {
        fn healthy(calls: &Calls) -> Self {
            Self { failures: 0, transient: true, calls: calls.clone() }
        }

        fn flaky(failures: usize, calls: &Calls) -> Self {
            Self { failures, transient: true, calls: calls.clone() }
        }

        fn broken(calls: &Calls) -> Self {
            Self { failures: usize::MAX, transient: false, calls: calls.clone() }
        }
    }

    struct MockSession {
        calls: Calls,
        pending: Vec<String>,
    }

    impl Connector for MockConnector {
        type Session = MockSession;

        fn connect(&self) -> impl Future<Output = Result<MockSession, StoreError>> + Send {
            let attempt = self.calls.connects.fetch_add(1, Ordering::SeqCst);
            let result = if attempt < self.failures {
                if self.transient {
                    Err(StoreError::Unavailable("connection refused".into()))
                } else {
                    Err(StoreError::Connection("authentication failed".into()))
                }
            } else {
                Ok(MockSession { calls: self.calls.clone(), pending: Vec::new() })
            };
            async move { result }
        }
    }

    impl StoreSession for MockSession {
        fn register_model(&mut self, name: &str, _schema: SchemaDocument) -> Result<(), StoreError> {
            self.calls.registered.lock().unwrap().push(name.to_string());
            self.pending.push(name.to_string());
            Ok(())
        }

        fn synchronize_schemas(&mut self) -> impl Future<Output = Result<SyncReport, StoreError>> + Send {
            self.calls.syncs.fetch_add(1, Ordering::SeqCst);
            let report = SyncReport { created: std::mem::take(&mut self.pending), ..Default::default() };
            async move { Ok(report) }
        }
    }

    fn models(names: &[&str]) -> Vec<CompiledModel> {
        let mut catalog = Catalog::new();
        names
            .iter()
            .map(|name| {
                let mut model = catalog.model(*name).unwrap();
                model.field::<String>("title", FieldOptions::required()).unwrap();
                model.finish().unwrap()
            })
            .collect()
    }

    fn paused<F: Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap()
            .block_on(future)
    }

    fn fast_retries(retries: u32) -> BootstrapConfig {
        BootstrapConfig::new(retries, Duration::from_millis(250))
    }

    describe "registration" {
        it "skips registration and synchronization with no models" {
            let calls = Calls::default();
            let ready = tokio_test::block_on(
                Bootstrap::new(MockConnector::healthy(&calls), ModelSource::Models(Vec::new())).run(),
            )
            .unwrap();

            assert!(ready.models.is_empty());
            assert!(ready.report.is_none());
            assert_eq!(calls.connects(), 1);
            assert!(calls.registered().is_empty());
            assert_eq!(calls.syncs(), 0);
        }

        it "registers every model in order and synchronizes once" {
            let calls = Calls::default();
            let ready = tokio_test::block_on(
                Bootstrap::new(MockConnector::healthy(&calls), models(&["Photo", "Album", "User"])).run(),
            )
            .unwrap();

            assert_eq!(calls.registered(), vec!["Photo", "Album", "User"]);
            assert_eq!(ready.models, vec!["Photo", "Album", "User"]);
            assert_eq!(calls.syncs(), 1);
            assert_eq!(ready.report.unwrap().created.len(), 3);
        }

        it "does not touch the store when declarations fail to load" {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("orphan.json"), r#"{ "objects": [] }"#).unwrap();
            let pattern = format!("{}/*.json", dir.path().display());

            let calls = Calls::default();
            let err = tokio_test::block_on(
                Bootstrap::new(MockConnector::healthy(&calls), ModelSource::Pattern(pattern)).run(),
            )
            .err()
            .unwrap();

            assert!(matches!(err, BootstrapError::Load(LoadError::MissingModel { .. })));
            assert!(calls.registered().is_empty());
            assert_eq!(calls.syncs(), 0);
        }
    }

    describe "retries" {
        it "recovers from transient failures within the bound" {
            let calls = Calls::default();
            let elapsed = paused(async {
                let start = tokio::time::Instant::now();
                Bootstrap::new(MockConnector::flaky(2, &calls), models(&["Photo"]))
                    .with_config(fast_retries(5))
                    .run()
                    .await
                    .unwrap();
                start.elapsed()
            });

            assert_eq!(calls.connects(), 3);
            assert_eq!(elapsed, Duration::from_millis(500));
            assert_eq!(calls.syncs(), 1);
        }

        it "gives up once the retries are exhausted" {
            let calls = Calls::default();
            let (err, elapsed) = paused(async {
                let start = tokio::time::Instant::now();
                let err = Bootstrap::new(MockConnector::flaky(usize::MAX, &calls), models(&["Photo"]))
                    .with_config(fast_retries(3))
                    .run()
                    .await
                    .err()
                    .unwrap();
                (err, start.elapsed())
            });

            assert!(matches!(
                err,
                BootstrapError::RetriesExhausted { retries: 3, source: StoreError::Unavailable(_) }
            ));
            assert_eq!(calls.connects(), 4);
            assert_eq!(elapsed, Duration::from_millis(750));
            assert!(calls.registered().is_empty());
        }

        it "waits the default delay between the default number of attempts" {
            let calls = Calls::default();
            let elapsed = paused(async {
                let start = tokio::time::Instant::now();
                let result = Bootstrap::new(MockConnector::flaky(usize::MAX, &calls), ModelSource::Models(Vec::new()))
                    .run()
                    .await;
                assert!(result.is_err());
                start.elapsed()
            });

            assert_eq!(calls.connects(), 6);
            assert_eq!(elapsed, Duration::from_secs(15));
        }

        it "does not retry fatal failures" {
            let calls = Calls::default();
            let err = paused(
                Bootstrap::new(MockConnector::broken(&calls), models(&["Photo"]))
                    .with_config(fast_retries(5))
                    .run(),
            )
            .err()
            .unwrap();

            assert!(matches!(err, BootstrapError::Store(StoreError::Connection(_))));
            assert_eq!(calls.connects(), 1);
            assert!(calls.registered().is_empty());
        }

        it "fails immediately with zero retries" {
            let calls = Calls::default();
            let err = paused(
                Bootstrap::new(MockConnector::flaky(1, &calls), models(&["Photo"]))
                    .with_config(fast_retries(0))
                    .run(),
            )
            .err()
            .unwrap();

            assert!(matches!(err, BootstrapError::RetriesExhausted { retries: 0, .. }));
            assert_eq!(calls.connects(), 1);
        }
    }

    describe "state" {
        it "ends ready after a successful run" {
            let calls = Calls::default();
            let bootstrap = Bootstrap::new(MockConnector::flaky(1, &calls), models(&["Photo"]))
                .with_config(fast_retries(2));
            let state = bootstrap.subscribe();
            assert_eq!(*state.borrow(), BootstrapState::Disconnected);

            paused(bootstrap.run()).unwrap();

            assert_eq!(*state.borrow(), BootstrapState::Ready);
            assert_eq!(state.borrow().to_string(), "ready");
        }

        it "ends disconnected when the store cannot be reached" {
            let calls = Calls::default();
            let bootstrap = Bootstrap::new(MockConnector::broken(&calls), models(&["Photo"]));
            let state = bootstrap.subscribe();

            assert!(paused(bootstrap.run()).is_err());
            assert_eq!(*state.borrow(), BootstrapState::Disconnected);
        }

        it "is connected while the models load" {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("orphan.json"), r#"{ "objects": [] }"#).unwrap();
            let pattern = format!("{}/*.json", dir.path().display());

            let calls = Calls::default();
            let bootstrap = Bootstrap::new(MockConnector::healthy(&calls), ModelSource::Pattern(pattern));
            let state = bootstrap.subscribe();

            assert!(tokio_test::block_on(bootstrap.run()).is_err());
            assert_eq!(*state.borrow(), BootstrapState::Connected);
        }
    }

    describe "sqlite store" {
        it "persists schemas loaded from declaration files" {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(
                dir.path().join("photo.json"),
                r#"{ "model": { "name": "Photo", "timestamps": true, "fields": [
                    { "name": "name", "declared": "string", "required": true }
                ] } }"#,
            )
            .unwrap();
            let pattern = format!("{}/*.json", dir.path().display());

            let db = Database::open_memory().unwrap();
            let ready = tokio_test::block_on(
                Bootstrap::new(SqliteConnector::with_database(db.clone()), ModelSource::Pattern(pattern)).run(),
            )
            .unwrap();

            assert_eq!(ready.models, vec!["Photo"]);
            let stored = db.get_schema("Photo").unwrap().unwrap();
            assert_eq!(stored.schema.required, vec!["_id", "name", "createdAt", "updatedAt"]);
        }

        it "reports unchanged schemas on a second run" {
            let db = Database::open_memory().unwrap();
            for _ in 0..2 {
                tokio_test::block_on(
                    Bootstrap::new(SqliteConnector::with_database(db.clone()), models(&["Photo"])).run(),
                )
                .unwrap();
            }

            let ready = tokio_test::block_on(
                Bootstrap::new(SqliteConnector::with_database(db.clone()), models(&["Photo"])).run(),
            )
            .unwrap();
            assert_eq!(ready.report.unwrap().unchanged, vec!["Photo"]);
            assert_eq!(db.get_schema("Photo").unwrap().unwrap().revision, 1);
        }
    }
}
