//! # Invoker: runs one command inside a host's start/stop envelope.
//!
//! The [`Invoker`] owns the event bus and the subscriber fan-out. Each call to
//! one of the `invoke*` methods builds a **fresh** host and drives it through a
//! linear lifecycle:
//!
//! ```text
//! build host ─► acquire command (ResourceScope)
//!                 │ Err ─► ResolutionFailed ─► dispose host ─► Err(Configuration)
//!                 ▼
//!              host.start(ctx)
//!                 │ ctx cancelled ─► CancelledByCaller (command never runs)
//!                 │ other error   ─► Failed(e)
//!                 ▼
//!              LinkedToken(ctx, host.shutting_down()) ─► run_once ─► Outcome
//!                 ▼
//!              host.stop()           (best-effort; failure logged at warn)
//!                 ▼
//!              read Options          (registered value, else flavor default)
//!                 ▼
//!              scope.release()       (exactly once)
//!                 ▼
//!              yield_now ─► dispose host (async when the host reports Release::Async)
//!                 ▼
//!              OutcomePolicy::resolve(outcome) ─► Result<(), InvokeError>
//! ```
//!
//! Event flow:
//! ```text
//! run_lifecycle / run_once ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//! ```
//!
//! [`Invoker::shutdown`] stops the listener after it has forwarded everything
//! already on the bus, then waits for every subscriber to drain its queue.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command::{Activate, Command, CommandFn, CommandRef, resolve_command};
use crate::config::{Config, Options};
use crate::core::{
    builder::InvokerBuilder,
    linker::LinkedToken,
    policy::{Outcome, OutcomePolicy},
    runner::run_once,
    scope::ResourceScope,
};
use crate::error::{HostError, InvokeError, ResolutionError, WorkError};
use crate::events::{Bus, Event, EventKind};
use crate::host::{BuildHost, Host, HostBuilder, Registry};
use crate::release::Release;
use crate::subscribers::SubscriberSet;

/// Runs commands inside hosts produced by a [`BuildHost`].
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use hostvisor::{Config, HostBuilder, Invoker, WorkError};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), hostvisor::InvokeError> {
///     let invoker = Invoker::builder(Config::default()).build(HostBuilder::new());
///
///     invoker
///         .invoke_fn("hello", |_ctx: CancellationToken| async {
///             println!("hello");
///             Ok::<(), WorkError>(())
///         }, CancellationToken::new())
///         .await
/// }
/// ```
pub struct Invoker<B: BuildHost = HostBuilder> {
    cfg: Config,
    builder: B,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    listener: Option<JoinHandle<()>>,
    listener_stop: CancellationToken,
}

impl Invoker {
    /// Starts building an invoker with `cfg`.
    ///
    /// The resulting builder accepts any [`BuildHost`], not only [`HostBuilder`].
    pub fn builder(cfg: Config) -> InvokerBuilder {
        InvokerBuilder::new(cfg)
    }
}

impl<B: BuildHost> Invoker<B> {
    /// Wires the bus to the subscriber set. Called by [`InvokerBuilder::build`].
    pub(crate) fn new_internal(
        cfg: Config,
        builder: B,
        bus: Bus,
        subs: Arc<SubscriberSet>,
    ) -> Self {
        let listener_stop = CancellationToken::new();
        let listener = if subs.is_empty() {
            None
        } else {
            Some(Self::subscriber_listener(&bus, &subs, listener_stop.clone()))
        };
        Self {
            cfg,
            builder,
            bus,
            subs,
            listener,
            listener_stop,
        }
    }

    fn subscriber_listener(
        bus: &Bus,
        subs: &Arc<SubscriberSet>,
        stop: CancellationToken,
    ) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        let set = Arc::clone(subs);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => lagged(skipped),
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => {
                        loop {
                            match rx.try_recv() {
                                Ok(ev) => set.emit(&ev),
                                Err(TryRecvError::Lagged(skipped)) => lagged(skipped),
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                }
            }
        })
    }

    /// Flushes pending events to the subscribers and waits for them to finish.
    ///
    /// Events already published on the bus are forwarded first; afterwards every
    /// subscriber worker drains its queue and exits. Events published after
    /// this call are not delivered.
    pub async fn shutdown(mut self) {
        self.listener_stop.cancel();
        if let Some(listener) = self.listener.take() {
            if let Err(err) = listener.await {
                tracing::warn!(error = %err, "subscriber listener ended abnormally");
            }
        }

        let empty = Arc::new(SubscriberSet::new(Vec::new(), self.bus.clone()));
        match Arc::try_unwrap(std::mem::replace(&mut self.subs, empty)) {
            Ok(set) => set.shutdown().await,
            Err(_) => tracing::warn!("subscriber set still shared; skipping drain"),
        }
    }

    /// Event bus of this invoker; subscribe to observe every invocation.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Configuration of this invoker.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    /// Runs command `T`, resolved from the host registry or activated when not registered.
    pub async fn invoke<T>(&self, ctx: CancellationToken) -> Result<(), InvokeError>
    where
        T: Command + Activate,
    {
        self.run_lifecycle(resolve_command::<T>, ctx).await
    }

    /// Runs a closure as the command.
    pub async fn invoke_fn<F, Fut>(
        &self,
        name: impl Into<Cow<'static, str>>,
        f: F,
        ctx: CancellationToken,
    ) -> Result<(), InvokeError>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
    {
        let command: CommandRef = CommandFn::arc(name, f);
        self.run_lifecycle(move |_: &dyn Registry| Ok(command), ctx)
            .await
    }

    /// Runs the closure returned by `factory`, which sees the host registry.
    ///
    /// The factory runs once, before the host is started. An error from it is
    /// reported as [`InvokeError::Configuration`].
    pub async fn invoke_with<Fac, F, Fut>(
        &self,
        name: impl Into<Cow<'static, str>>,
        factory: Fac,
        ctx: CancellationToken,
    ) -> Result<(), InvokeError>
    where
        Fac: FnOnce(&dyn Registry) -> Result<F, ResolutionError> + Send,
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
    {
        let name = name.into();
        self.run_lifecycle(
            move |registry: &dyn Registry| {
                let f = factory(registry)?;
                Ok(CommandFn::arc(name, f) as CommandRef)
            },
            ctx,
        )
        .await
    }

    async fn run_lifecycle<R>(&self, resolve: R, ctx: CancellationToken) -> Result<(), InvokeError>
    where
        R: FnOnce(&dyn Registry) -> Result<CommandRef, ResolutionError> + Send,
    {
        let host = self.builder.build().map_err(InvokeError::Build)?;

        let scope = match ResourceScope::acquire(host.registry(), resolve) {
            Ok(scope) => scope,
            Err(err) => {
                self.bus
                    .publish(Event::new(EventKind::ResolutionFailed).with_reason(err.to_string()));
                self.dispose(&host).await;
                return Err(InvokeError::Configuration(err));
            }
        };
        let name: Arc<str> = Arc::from(scope.command().name());

        let outcome = self.start_and_run(&host, &scope, &ctx).await;
        self.stop(&host).await;

        let options = self.options(host.registry());
        scope.release().await;
        self.bus
            .publish(Event::new(EventKind::CommandReleased).with_command(name.clone()));

        tokio::task::yield_now().await;
        self.dispose(&host).await;

        OutcomePolicy::new(options).resolve(outcome, &name, &self.bus)
    }

    async fn start_and_run(
        &self,
        host: &B::Host,
        scope: &ResourceScope,
        ctx: &CancellationToken,
    ) -> Outcome {
        self.bus.publish(Event::new(EventKind::HostStarting));
        if ctx.is_cancelled() {
            self.bus
                .publish(Event::new(EventKind::HostStartFailed).with_reason("canceled"));
            return Outcome::CancelledByCaller;
        }

        match host.start(ctx.clone()).await {
            Ok(()) => self.bus.publish(Event::new(EventKind::HostStarted)),
            Err(HostError::Canceled) => {
                self.bus
                    .publish(Event::new(EventKind::HostStartFailed).with_reason("canceled"));
                return Outcome::CancelledByCaller;
            }
            Err(err) => {
                self.bus
                    .publish(Event::new(EventKind::HostStartFailed).with_reason(err.to_string()));
                return Outcome::Failed(Box::new(err));
            }
        }

        let shutdown = host.shutting_down();
        let linked = LinkedToken::link(ctx, &shutdown);
        run_once(scope.command(), linked.token(), &shutdown, &self.bus).await
    }

    async fn stop(&self, host: &B::Host) {
        self.bus.publish(Event::new(EventKind::HostStopping));
        match host.stop().await {
            Ok(()) => self.bus.publish(Event::new(EventKind::HostStopped)),
            Err(err) => {
                tracing::warn!(error = %err, "host failed to stop");
                self.bus
                    .publish(Event::new(EventKind::HostStopFailed).with_reason(err.to_string()));
            }
        }
    }

    fn options(&self, registry: &dyn Registry) -> Options {
        match registry.try_resolve::<Options>() {
            Ok(Some(options)) => *options,
            Ok(None) => self.cfg.default_options(),
            Err(err) => {
                tracing::warn!(error = %err, "registered options are unusable; using defaults");
                self.cfg.default_options()
            }
        }
    }

    async fn dispose(&self, host: &B::Host) {
        match host.disposal() {
            Release::Async => host.dispose_async().await,
            Release::Sync => host.dispose(),
            Release::None => {}
        }
        self.bus.publish(Event::new(EventKind::HostDisposed));
    }
}

fn lagged(skipped: u64) {
    tracing::warn!(skipped, "subscriber listener lagged behind the bus");
}

impl<B: BuildHost> Drop for Invoker<B> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::host::{HostedService, Lifetime, ServiceRegistry};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    type Log = Arc<Mutex<Vec<String>>>;

    fn push(log: &Log, what: &str) {
        log.lock().unwrap().push(what.to_string());
    }

    /// Host that records every lifecycle call.
    struct MockHost {
        log: Log,
        registry: ServiceRegistry,
        lifetime: Lifetime,
        fail_start: bool,
        fail_stop: bool,
    }

    #[async_trait]
    impl Host for MockHost {
        fn registry(&self) -> &dyn Registry {
            &self.registry
        }

        fn shutting_down(&self) -> CancellationToken {
            self.lifetime.stopping()
        }

        async fn start(&self, ctx: CancellationToken) -> Result<(), HostError> {
            push(&self.log, "start");
            if ctx.is_cancelled() {
                return Err(HostError::Canceled);
            }
            if self.fail_start {
                return Err(HostError::Start {
                    service: "mock".into(),
                    source: "port in use".into(),
                });
            }
            Ok(())
        }

        async fn stop(&self) -> Result<(), HostError> {
            push(&self.log, "stop");
            self.lifetime.stop_application();
            if self.fail_stop {
                return Err(HostError::Stop {
                    service: "mock".into(),
                    source: "stuck".into(),
                });
            }
            Ok(())
        }

        fn disposal(&self) -> Release {
            Release::Sync
        }

        fn dispose(&self) {
            push(&self.log, "dispose");
        }
    }

    #[derive(Default)]
    struct MockBuilder {
        log: Log,
        options: Option<Options>,
        fail_start: bool,
        fail_stop: bool,
    }

    impl BuildHost for MockBuilder {
        type Host = MockHost;

        fn build(&self) -> Result<MockHost, HostError> {
            push(&self.log, "build");
            let lifetime = Lifetime::new();
            let mut registry = ServiceRegistry::new();
            registry.add_singleton(lifetime.clone());
            registry.add_singleton(Arc::clone(&self.log));
            if let Some(options) = self.options {
                registry.add_singleton(options);
            }
            Ok(MockHost {
                log: Arc::clone(&self.log),
                registry,
                lifetime,
                fail_start: self.fail_start,
                fail_stop: self.fail_stop,
            })
        }
    }

    /// Command that records invoke and release.
    struct Tracked {
        log: Arc<Log>,
        fail: bool,
    }

    #[async_trait]
    impl Command for Tracked {
        fn name(&self) -> &str {
            "tracked"
        }

        async fn invoke(&self, _ctx: CancellationToken) -> Result<(), WorkError> {
            push(&self.log, "invoke");
            if self.fail {
                return Err(WorkError::fail(std::io::Error::other("boom")));
            }
            Ok(())
        }

        fn release_kind(&self) -> Release {
            Release::Async
        }

        async fn release_async(&self) {
            push(&self.log, "release");
        }
    }

    impl Activate for Tracked {
        fn activate(registry: &dyn Registry) -> Result<Self, ResolutionError> {
            Ok(Self {
                log: registry.resolve::<Log>()?,
                fail: false,
            })
        }
    }

    fn invoker(builder: MockBuilder) -> Invoker<MockBuilder> {
        InvokerBuilder::new(Config::default()).build(builder)
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn lifecycle_runs_in_order() {
        let builder = MockBuilder::default();
        let log = Arc::clone(&builder.log);
        let inv = invoker(builder);

        inv.invoke::<Tracked>(CancellationToken::new()).await.unwrap();
        assert_eq!(
            entries(&log),
            vec!["build", "start", "invoke", "stop", "release", "dispose"]
        );
    }

    #[tokio::test]
    async fn events_follow_lifecycle() {
        let inv = invoker(MockBuilder::default());
        let mut rx = inv.bus().subscribe();

        inv.invoke::<Tracked>(CancellationToken::new()).await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::HostStarting,
                EventKind::HostStarted,
                EventKind::CommandStarting,
                EventKind::CommandCompleted,
                EventKind::HostStopping,
                EventKind::HostStopped,
                EventKind::CommandReleased,
                EventKind::HostDisposed,
            ]
        );
    }

    #[tokio::test]
    async fn pre_cancelled_token_skips_command_but_releases_and_disposes() {
        let builder = MockBuilder::default();
        let log = Arc::clone(&builder.log);
        let inv = invoker(builder);
        let ctx = CancellationToken::new();
        ctx.cancel();

        let err = inv.invoke::<Tracked>(ctx).await.unwrap_err();
        assert!(err.is_canceled());
        assert_eq!(entries(&log), vec!["build", "stop", "release", "dispose"]);
    }

    #[tokio::test]
    async fn start_failure_is_policy_controlled() {
        let builder = MockBuilder {
            fail_start: true,
            options: Some(Options::throwing()),
            ..MockBuilder::default()
        };
        let log = Arc::clone(&builder.log);
        let inv = invoker(builder);

        let err = inv.invoke::<Tracked>(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.as_label(), "invoke_failed");
        assert!(err.downcast_ref::<HostError>().is_some());
        assert!(!entries(&log).contains(&"invoke".to_string()));
    }

    #[tokio::test]
    async fn stop_failure_keeps_outcome() {
        let builder = MockBuilder {
            fail_stop: true,
            ..MockBuilder::default()
        };
        let log = Arc::clone(&builder.log);
        let inv = invoker(builder);

        inv.invoke::<Tracked>(CancellationToken::new()).await.unwrap();
        assert_eq!(
            entries(&log),
            vec!["build", "start", "invoke", "stop", "release", "dispose"]
        );
    }

    #[tokio::test]
    async fn registered_options_override_flavor_default() {
        let builder = MockBuilder {
            options: Some(Options::default()),
            ..MockBuilder::default()
        };
        let inv = InvokerBuilder::new(Config::strict()).build(builder);

        let res = inv
            .invoke_fn(
                "fails",
                |_ctx: CancellationToken| async {
                    Err::<(), _>(WorkError::fail(std::io::Error::other("boom")))
                },
                CancellationToken::new(),
            )
            .await;
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn strict_flavor_rethrows_by_default() {
        let inv = InvokerBuilder::new(Config::strict()).build(MockBuilder::default());

        let err = inv
            .invoke_fn(
                "fails",
                |_ctx: CancellationToken| async {
                    Err::<(), _>(WorkError::fail(std::io::Error::other("boom")))
                },
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<std::io::Error>().unwrap().to_string(), "boom");
    }

    #[tokio::test]
    async fn failing_factory_never_starts_host() {
        let builder = MockBuilder::default();
        let log = Arc::clone(&builder.log);
        let inv = invoker(builder);
        let mut rx = inv.bus().subscribe();

        let err = inv
            .invoke_with(
                "missing",
                |r: &dyn Registry| {
                    r.resolve::<String>()?;
                    Ok(|_ctx: CancellationToken| async { Ok::<(), WorkError>(()) })
                },
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.as_label(), "invoke_configuration");
        assert_eq!(entries(&log), vec!["build", "dispose"]);
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::ResolutionFailed);
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::HostDisposed);
    }

    #[tokio::test]
    async fn shutdown_from_inside_command_returns_normally() {
        let inv = invoker(MockBuilder::default());

        inv.invoke_with(
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
    }

    #[tokio::test]
    async fn generic_host_services_wrap_the_command() {
        struct Flag(Arc<AtomicBool>);

        #[async_trait]
        impl HostedService for Flag {
            async fn start(&self, _ctx: CancellationToken) -> Result<(), BoxError> {
                self.0.store(true, Ordering::SeqCst);
                Ok(())
            }

            async fn stop(&self) -> Result<(), BoxError> {
                self.0.store(false, Ordering::SeqCst);
                Ok(())
            }
        }

        let running = Arc::new(AtomicBool::new(false));
        let inv = Invoker::builder(Config::default()).build(
            HostBuilder::new().with_hosted_service(Arc::new(Flag(Arc::clone(&running)))),
        );

        let seen = Arc::clone(&running);
        inv.invoke_fn(
            "check",
            move |_ctx: CancellationToken| {
                let seen = Arc::clone(&seen);
                async move {
                    assert!(seen.load(Ordering::SeqCst));
                    Ok::<(), WorkError>(())
                }
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(!running.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_flushes_subscribers() {
        use crate::subscribers::Subscribe;

        #[derive(Default)]
        struct Slow(Mutex<Vec<EventKind>>);

        #[async_trait]
        impl Subscribe for Slow {
            async fn on_event(&self, ev: &Event) {
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                self.0.lock().unwrap().push(ev.kind);
            }

            fn name(&self) -> &'static str {
                "slow"
            }
        }

        let slow = Arc::new(Slow::default());
        let inv = InvokerBuilder::new(Config::default())
            .with_subscribers(vec![slow.clone() as Arc<dyn Subscribe>])
            .build(MockBuilder::default());

        inv.invoke::<Tracked>(CancellationToken::new()).await.unwrap();
        inv.shutdown().await;

        let seen = slow.0.lock().unwrap().clone();
        assert_eq!(seen.first(), Some(&EventKind::HostStarting));
        assert_eq!(seen.last(), Some(&EventKind::HostDisposed));
    }

    #[tokio::test]
    async fn shutdown_without_subscribers_is_a_no_op() {
        let inv = invoker(MockBuilder::default());
        assert_eq!(inv.subscriber_count(), 0);
        inv.shutdown().await;
    }
}
