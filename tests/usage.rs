use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use hostvisor::{
    Activate, BoxError, Command, Config, Event, EventKind, HostBuilder, HostedService, Invoker,
    Lifetime, Options, Registry, Release, ResolutionError, Subscribe, WorkError,
};

#[derive(Default)]
struct Journal(Mutex<Vec<String>>);

impl Journal {
    fn write(&self, line: impl Into<String>) {
        self.0.lock().unwrap().push(line.into());
    }

    fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

fn host_with(journal: &Arc<Journal>) -> HostBuilder {
    let journal = Arc::clone(journal);
    HostBuilder::new().configure_services(move |s| {
        s.add_shared(journal);
    })
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

fn position(events: &[Event], kind: EventKind) -> usize {
    events
        .iter()
        .position(|e| e.kind == kind)
        .unwrap_or_else(|| panic!("{kind:?} not published"))
}

struct DisposableCommand {
    journal: Arc<Journal>,
}

#[async_trait]
impl Command for DisposableCommand {
    fn name(&self) -> &str {
        "disposable"
    }

    async fn invoke(&self, ctx: CancellationToken) -> Result<(), WorkError> {
        self.journal.write("Start");
        tokio::select! {
            _ = ctx.cancelled() => return Err(WorkError::Canceled),
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
        self.journal.write("End");
        Ok(())
    }

    fn release_kind(&self) -> Release {
        Release::Sync
    }

    fn release(&self) {
        self.journal.write("Dispose");
    }
}

impl Activate for DisposableCommand {
    fn activate(registry: &dyn Registry) -> Result<Self, ResolutionError> {
        Ok(Self {
            journal: registry.resolve::<Journal>()?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("application failure")]
struct ApplicationError;

struct ThrowingCommand {
    journal: Arc<Journal>,
}

#[async_trait]
impl Command for ThrowingCommand {
    fn name(&self) -> &str {
        "throwing"
    }

    async fn invoke(&self, _ctx: CancellationToken) -> Result<(), WorkError> {
        self.journal.write("Start");
        Err(WorkError::fail(ApplicationError))
    }
}

impl Activate for ThrowingCommand {
    fn activate(registry: &dyn Registry) -> Result<Self, ResolutionError> {
        Ok(Self {
            journal: registry.resolve::<Journal>()?,
        })
    }
}

#[tokio::test(start_paused = true)]
async fn disposable_command_logs_in_order_and_is_released_once() {
    let journal = Arc::new(Journal::default());
    let invoker = Invoker::builder(Config::default()).build(host_with(&journal));
    let mut rx = invoker.bus().subscribe();

    invoker
        .invoke::<DisposableCommand>(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(journal.lines(), vec!["Start", "End", "Dispose"]);

    let events = drain(&mut rx);
    assert!(
        position(&events, EventKind::HostStopped) < position(&events, EventKind::CommandReleased)
    );
    assert!(
        position(&events, EventKind::CommandReleased) < position(&events, EventKind::HostDisposed)
    );
    assert_eq!(events.last().map(|e| e.kind), Some(EventKind::HostDisposed));
}

#[tokio::test(start_paused = true)]
async fn registered_use_case_runs_through_factory() {
    struct UseCase {
        journal: Arc<Journal>,
    }

    impl UseCase {
        async fn execute(&self, args: &[&str], ctx: CancellationToken) -> Result<(), WorkError> {
            self.journal.write("Start");
            self.journal.write(format!("args: {}", args.join(" ")));
            tokio::select! {
                _ = ctx.cancelled() => return Err(WorkError::Canceled),
                _ = tokio::time::sleep(Duration::from_millis(100)) => {}
            }
            self.journal.write("End");
            Ok(())
        }
    }

    let journal = Arc::new(Journal::default());
    let use_case = UseCase {
        journal: Arc::clone(&journal),
    };
    let host = host_with(&journal).configure_services(move |s| {
        s.add_singleton(use_case);
    });
    let invoker = Invoker::builder(Config::default()).build(host);

    invoker
        .invoke_with(
            "use-case",
            |r: &dyn Registry| {
                let use_case = r.resolve::<UseCase>()?;
                Ok(move |ctx: CancellationToken| {
                    let use_case = Arc::clone(&use_case);
                    async move { use_case.execute(&["foo", "bar"], ctx).await }
                })
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(journal.lines(), vec!["Start", "args: foo bar", "End"]);
}

#[tokio::test]
async fn closure_command_runs() {
    let journal = Arc::new(Journal::default());
    let invoker = Invoker::builder(Config::default()).build(HostBuilder::new());

    let seen = Arc::clone(&journal);
    invoker
        .invoke_fn(
            "closure",
            move |_ctx: CancellationToken| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.write("closure ran");
                    Ok::<(), WorkError>(())
                }
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(journal.lines(), vec!["closure ran"]);
}

#[tokio::test]
async fn failure_is_swallowed_by_default() {
    let journal = Arc::new(Journal::default());
    let invoker = Invoker::builder(Config::default()).build(host_with(&journal));
    let mut rx = invoker.bus().subscribe();

    invoker
        .invoke::<ThrowingCommand>(CancellationToken::new())
        .await
        .unwrap();

    let events = drain(&mut rx);
    let failed = &events[position(&events, EventKind::CommandFailed)];
    assert_eq!(failed.level(), tracing::Level::WARN);
    assert_eq!(failed.reason.as_deref(), Some("application failure"));

    let suppressed = &events[position(&events, EventKind::FailureSuppressed)];
    assert_eq!(suppressed.level(), tracing::Level::INFO);
    assert_eq!(suppressed.command.as_deref(), Some("throwing"));
    assert!(!events.iter().any(|e| e.level() == tracing::Level::ERROR));
}

#[tokio::test]
async fn failure_is_rethrown_when_options_request_it() {
    let journal = Arc::new(Journal::default());
    let host = host_with(&journal).configure_services(|s| {
        s.add_singleton(Options::throwing());
    });
    let invoker = Invoker::builder(Config::default()).build(host);

    let err = invoker
        .invoke::<ThrowingCommand>(CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.downcast_ref::<ApplicationError>().is_some());
    assert_eq!(journal.lines(), vec!["Start"]);
}

#[tokio::test]
async fn strict_flavor_rethrows_without_options() {
    let journal = Arc::new(Journal::default());
    let invoker = Invoker::builder(Config::strict()).build(host_with(&journal));

    let err = invoker
        .invoke::<ThrowingCommand>(CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.as_label(), "invoke_failed");
}

#[tokio::test]
async fn pre_cancelled_token_never_starts_the_command() {
    let journal = Arc::new(Journal::default());
    let host = host_with(&journal).configure_services(|s| {
        s.add_singleton(Options::throwing());
    });
    let invoker = Invoker::builder(Config::default()).build(host);
    let ctx = CancellationToken::new();
    ctx.cancel();

    let err = invoker.invoke::<DisposableCommand>(ctx).await.unwrap_err();

    assert!(err.is_canceled());
    assert!(!journal.lines().iter().any(|l| l == "Start"));
    assert_eq!(journal.lines(), vec!["Dispose"]);
}

#[tokio::test]
async fn caller_cancellation_mid_run_is_propagated() {
    let journal = Arc::new(Journal::default());
    let invoker = Invoker::builder(Config::default()).build(host_with(&journal));
    let ctx = CancellationToken::new();

    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let err = invoker.invoke::<DisposableCommand>(ctx).await.unwrap_err();
    assert!(err.is_canceled());
    assert_eq!(journal.lines(), vec!["Start", "Dispose"]);
}

#[tokio::test]
async fn shutdown_requested_by_command_returns_normally() {
    let invoker = Invoker::builder(Config::strict()).build(HostBuilder::new());
    let mut rx = invoker.bus().subscribe();

    invoker
        .invoke_with(
            "self-stopping",
            |r: &dyn Registry| {
                let lifetime = r.resolve::<Lifetime>()?;
                Ok(move |ctx: CancellationToken| {
                    let lifetime = Arc::clone(&lifetime);
                    async move {
                        lifetime.stop_application();
                        ctx.cancelled().await;
                        Err::<(), _>(WorkError::Canceled)
                    }
                })
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let events = drain(&mut rx);
    let canceled = &events[position(&events, EventKind::CommandCanceled)];
    assert_eq!(canceled.reason.as_deref(), Some("shutdown"));
    assert_eq!(canceled.level(), tracing::Level::INFO);
    position(&events, EventKind::ShutdownRequested);
}

#[tokio::test]
async fn unresolvable_command_is_a_configuration_error() {
    let invoker = Invoker::builder(Config::default()).build(HostBuilder::new());
    let mut rx = invoker.bus().subscribe();

    let err = invoker
        .invoke::<DisposableCommand>(CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.as_label(), "invoke_configuration");
    let events = drain(&mut rx);
    assert!(!events.iter().any(|e| e.kind == EventKind::HostStarting));
    assert_eq!(
        events.iter().map(|e| e.kind).collect::<Vec<_>>(),
        vec![EventKind::ResolutionFailed, EventKind::HostDisposed]
    );
}

#[tokio::test(start_paused = true)]
async fn release_happens_after_stop_and_before_disposal() {
    struct Service {
        journal: Arc<Journal>,
    }

    #[async_trait]
    impl HostedService for Service {
        fn name(&self) -> &str {
            "service"
        }

        async fn start(&self, _ctx: CancellationToken) -> Result<(), BoxError> {
            self.journal.write("service:start");
            Ok(())
        }

        async fn stop(&self) -> Result<(), BoxError> {
            self.journal.write("service:stop");
            Ok(())
        }

        async fn dispose(&self) {
            self.journal.write("service:dispose");
        }
    }

    let journal = Arc::new(Journal::default());
    let host = host_with(&journal).with_hosted_service(Arc::new(Service {
        journal: Arc::clone(&journal),
    }));
    let invoker = Invoker::builder(Config::default()).build(host);

    invoker
        .invoke::<DisposableCommand>(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        journal.lines(),
        vec![
            "service:start",
            "Start",
            "End",
            "service:stop",
            "Dispose",
            "service:dispose"
        ]
    );
}

#[tokio::test]
async fn subscribers_receive_every_lifecycle_event() {
    #[derive(Default)]
    struct Recorder(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    let recorder = Arc::new(Recorder::default());
    let invoker = Invoker::builder(Config::default())
        .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
        .build(HostBuilder::new());

    invoker
        .invoke_fn(
            "noop",
            |_ctx: CancellationToken| async { Ok::<(), WorkError>(()) },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    invoker.shutdown().await;

    let seen = recorder.0.lock().unwrap().clone();
    assert_eq!(seen.first(), Some(&EventKind::HostStarting));
    assert!(seen.contains(&EventKind::CommandCompleted));
    assert_eq!(seen.last(), Some(&EventKind::HostDisposed));
}

/// Command that refuses to run once it has been released.
struct Connection {
    id: usize,
    journal: Arc<Journal>,
    released: AtomicBool,
}

#[async_trait]
impl Command for Connection {
    fn name(&self) -> &str {
        "connection"
    }

    async fn invoke(&self, _ctx: CancellationToken) -> Result<(), WorkError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(WorkError::fail(std::io::Error::other("connection already closed")));
        }
        self.journal.write(format!("open {}", self.id));
        Ok(())
    }

    fn release_kind(&self) -> Release {
        Release::Sync
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
        self.journal.write(format!("close {}", self.id));
    }
}

impl Activate for Connection {
    fn activate(_registry: &dyn Registry) -> Result<Self, ResolutionError> {
        Err(ResolutionError::not_registered::<Self>())
    }
}

fn connection_host(journal: &Arc<Journal>) -> HostBuilder {
    let built = Arc::new(AtomicUsize::new(0));
    host_with(journal).configure_services(move |s| {
        s.add_singleton(Options::throwing());
        s.add_scoped(move |r: &dyn Registry| {
            Ok(Connection {
                id: built.fetch_add(1, Ordering::SeqCst),
                journal: r.resolve::<Journal>()?,
                released: AtomicBool::new(false),
            })
        });
    })
}

#[tokio::test]
async fn registered_command_is_fresh_for_every_invocation() {
    let journal = Arc::new(Journal::default());
    let invoker = Invoker::builder(Config::default()).build(connection_host(&journal));

    for _ in 0..2 {
        invoker
            .invoke::<Connection>(CancellationToken::new())
            .await
            .unwrap();
    }

    assert_eq!(journal.lines(), vec!["open 0", "close 0", "open 1", "close 1"]);
}

#[tokio::test]
async fn concurrent_invocations_do_not_share_a_registered_command() {
    let journal = Arc::new(Journal::default());
    let invoker = Invoker::builder(Config::default()).build(connection_host(&journal));

    let (a, b) = tokio::join!(
        invoker.invoke::<Connection>(CancellationToken::new()),
        invoker.invoke::<Connection>(CancellationToken::new()),
    );
    a.unwrap();
    b.unwrap();

    let mut lines = journal.lines();
    lines.sort();
    assert_eq!(lines, vec!["close 0", "close 1", "open 0", "open 1"]);
}

#[tokio::test]
async fn singleton_registered_command_is_a_configuration_error() {
    let journal = Arc::new(Journal::default());
    let shared = DisposableCommand {
        journal: Arc::clone(&journal),
    };
    let host = host_with(&journal).configure_services(move |s| {
        s.add_singleton(shared);
    });
    let invoker = Invoker::builder(Config::default()).build(host);

    let err = invoker
        .invoke::<DisposableCommand>(CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.as_label(), "invoke_configuration");
    assert!(err.to_string().contains("singleton"));
    assert!(journal.lines().is_empty());
}

#[tokio::test]
async fn registered_command_with_missing_dependency_is_a_configuration_error() {
    struct Missing;

    let journal = Arc::new(Journal::default());
    let host = host_with(&journal).configure_services(|s| {
        s.add_transient(|r: &dyn Registry| {
            let _missing = r.resolve::<Missing>()?;
            Ok(DisposableCommand {
                journal: r.resolve::<Journal>()?,
            })
        });
    });
    let invoker = Invoker::builder(Config::default()).build(host);
    let mut rx = invoker.bus().subscribe();

    let err = invoker
        .invoke::<DisposableCommand>(CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.as_label(), "invoke_configuration");
    assert!(journal.lines().is_empty());
    let events = drain(&mut rx);
    let failed = &events[position(&events, EventKind::ResolutionFailed)];
    assert!(failed.reason.as_deref().unwrap_or("").contains("Missing"));
}
