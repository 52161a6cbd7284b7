use super::options::ExtractionOptions;
use super::result::ExtractionResult;
use super::sink::{ErrorSink, TracingErrorSink};
use crate::cancel::CancellationSignal;
use crate::error::{ExtractError, UserFriendlyError};
use crate::extractor::{Extractor, ExtractorRegistry};
use crate::scanner::absolute_path;
use futures::{FutureExt, Stream};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

type StreamItem = Result<ExtractionResult, ExtractError>;

/// Drives many extractions concurrently under a fixed bound.
///
/// The bound is a semaphore owned by the pipeline, so it caps simultaneous
/// extractions across every run started from the same instance.
pub struct BatchPipeline {
    registry: Arc<ExtractorRegistry>,
    options: ExtractionOptions,
    sink: Arc<dyn ErrorSink>,
    slots: Arc<Semaphore>,
}

impl BatchPipeline {
    pub fn new(registry: ExtractorRegistry, options: ExtractionOptions) -> Self {
        let options = options.with_max_parallelism(options.max_parallelism);
        Self {
            registry: Arc::new(registry),
            slots: Arc::new(Semaphore::new(options.max_parallelism)),
            options,
            sink: Arc::new(TracingErrorSink),
        }
    }

    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    /// Concurrency slots not currently held by an extraction.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Starts extracting `paths` and returns the stream of results.
    ///
    /// Results arrive in completion order. Under `ContinueOnError` every
    /// failure is a failed result; under `FailFast` the first failure is the
    /// stream's final item. Cancellation stops admission, lets in-flight
    /// extractions drain, then ends the stream with `Err(Cancelled)`.
    ///
    /// The path source is pulled on a blocking thread, so a lazy directory
    /// walk can be passed directly. Must be called within a tokio runtime.
    pub fn run<I>(&self, paths: I, cancel: CancellationSignal) -> ResultStream
    where
        I: IntoIterator<Item = PathBuf>,
        I::IntoIter: Send + 'static,
    {
        let capacity = self.options.max_parallelism;
        let (path_tx, path_rx) = mpsc::channel(capacity);
        let (result_tx, result_rx) = mpsc::channel(capacity);

        let source = paths.into_iter();
        let feeder_cancel = cancel.clone();
        tokio::task::spawn_blocking(move || feed_paths(source, path_tx, feeder_cancel));

        let driver = Driver {
            registry: self.registry.clone(),
            options: self.options,
            sink: self.sink.clone(),
            slots: self.slots.clone(),
            cancel,
            tx: result_tx,
        };
        tokio::spawn(driver.run(path_rx));

        ResultStream { rx: result_rx }
    }
}

fn feed_paths<I>(source: I, tx: mpsc::Sender<PathBuf>, cancel: CancellationSignal)
where
    I: Iterator<Item = PathBuf>,
{
    for path in source {
        if cancel.is_cancelled() || tx.blocking_send(path).is_err() {
            break;
        }
    }
}

/// Completion-ordered results of a [`BatchPipeline::run`].
///
/// A terminal `Err` means the run was aborted (FailFast) or cancelled.
/// Dropping the stream stops admission and aborts in-flight extractions.
pub struct ResultStream {
    rx: mpsc::Receiver<StreamItem>,
}

impl ResultStream {
    pub async fn next(&mut self) -> Option<StreamItem> {
        self.rx.recv().await
    }

    /// Collects every result, stopping at the first abort.
    pub async fn collect_all(mut self) -> Result<Vec<ExtractionResult>, ExtractError> {
        let mut results = Vec::new();
        while let Some(item) = self.rx.recv().await {
            results.push(item?);
        }
        Ok(results)
    }
}

impl Stream for ResultStream {
    type Item = StreamItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

struct Completed {
    path: PathBuf,
    extractor: String,
    outcome: Result<String, ExtractError>,
    elapsed: Duration,
    // Released only once the driver has handled the outcome.
    permit: OwnedSemaphorePermit,
}

enum Outcome {
    Emit(ExtractionResult),
    Abort(ExtractError),
    Skip,
}

#[derive(Default)]
struct RunStats {
    succeeded: usize,
    failed: usize,
}

struct Driver {
    registry: Arc<ExtractorRegistry>,
    options: ExtractionOptions,
    sink: Arc<dyn ErrorSink>,
    slots: Arc<Semaphore>,
    cancel: CancellationSignal,
    tx: mpsc::Sender<StreamItem>,
}

impl Driver {
    async fn run(self, mut paths: mpsc::Receiver<PathBuf>) {
        let started = Instant::now();
        let mut stats = RunStats::default();
        let mut in_flight: JoinSet<Completed> = JoinSet::new();
        // Resolved path waiting for a free slot.
        let mut pending: Option<(PathBuf, Arc<dyn Extractor>)> = None;
        let mut source_open = true;
        let mut cancelled = false;

        info!(
            max_parallelism = self.options.max_parallelism,
            policy = ?self.options.error_policy,
            "batch extraction started"
        );

        loop {
            let admitting = !cancelled && (source_open || pending.is_some());
            if !admitting && in_flight.is_empty() {
                break;
            }

            let outcome = tokio::select! {
                biased;

                _ = self.tx.closed() => {
                    debug!("result stream dropped; aborting in-flight extractions");
                    return;
                }

                _ = self.cancel.cancelled(), if !cancelled => {
                    cancelled = true;
                    if let Some((path, _)) = pending.take() {
                        debug!(path = %path.display(), "dropped pending file on cancellation");
                    }
                    Outcome::Skip
                }

                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    match joined {
                        Ok(completed) => self.complete(completed, cancelled),
                        Err(join_error) => {
                            error!(error = %join_error, "extraction task did not complete");
                            Outcome::Skip
                        }
                    }
                }

                permit = self.slots.clone().acquire_owned(), if pending.is_some() && !cancelled => {
                    match (permit, pending.take()) {
                        (Ok(permit), Some((path, extractor))) => {
                            if self.cancel.is_cancelled() {
                                cancelled = true;
                            } else {
                                self.spawn(&mut in_flight, path, extractor, permit);
                            }
                        }
                        (Err(_), _) => {
                            error!("concurrency semaphore closed");
                            cancelled = true;
                        }
                        (Ok(_), None) => {}
                    }
                    Outcome::Skip
                }

                next = paths.recv(), if source_open && pending.is_none() && !cancelled => {
                    match next {
                        None => {
                            source_open = false;
                            Outcome::Skip
                        }
                        Some(path) => {
                            let path = absolute_path(&path);
                            match self.resolve(&path) {
                                Ok(extractor) => {
                                    pending = Some((path, extractor));
                                    Outcome::Skip
                                }
                                Err(error) => self.fail(path, error, None, cancelled),
                            }
                        }
                    }
                }
            };

            match outcome {
                Outcome::Emit(result) => {
                    if result.succeeded() {
                        stats.succeeded += 1;
                    } else {
                        stats.failed += 1;
                    }
                    if self.tx.send(Ok(result)).await.is_err() {
                        debug!("result stream dropped; aborting in-flight extractions");
                        return;
                    }
                }
                Outcome::Abort(error) => {
                    // In-flight extractions finish on their own; their results are discarded.
                    in_flight.detach_all();
                    info!(error = %error, "batch extraction aborted (fail fast)");
                    let _ = self.tx.send(Err(error)).await;
                    return;
                }
                Outcome::Skip => {}
            }
        }

        info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch extraction finished"
        );

        if cancelled {
            let _ = self.tx.send(Err(ExtractError::Cancelled)).await;
        }
    }

    /// Registry lookup; a panicking `can_handle` fails this file only.
    fn resolve(&self, path: &Path) -> Result<Arc<dyn Extractor>, ExtractError> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.registry.resolve(path))) {
            Ok(Some(extractor)) => Ok(extractor),
            Ok(None) => Err(ExtractError::unsupported(path)),
            Err(payload) => Err(ExtractError::decode(
                path,
                format!(
                    "extractor panicked while claiming path: {}",
                    panic_message(payload.as_ref())
                ),
            )),
        }
    }

    fn spawn(
        &self,
        in_flight: &mut JoinSet<Completed>,
        path: PathBuf,
        extractor: Arc<dyn Extractor>,
        permit: OwnedSemaphorePermit,
    ) {
        debug!(path = %path.display(), extractor = extractor.name(), "extraction started");
        let cancel = self.cancel.clone();

        in_flight.spawn(async move {
            let started = Instant::now();

            let caught = AssertUnwindSafe(extractor.extract(&path, &cancel))
                .catch_unwind()
                .await;
            let outcome = match caught {
                Ok(outcome) => outcome,
                Err(payload) => Err(ExtractError::decode(
                    &path,
                    format!("extractor panicked: {}", panic_message(payload.as_ref())),
                )),
            };

            Completed {
                extractor: extractor.name().to_string(),
                path,
                outcome,
                elapsed: started.elapsed(),
                permit,
            }
        });
    }

    fn complete(&self, completed: Completed, cancelled: bool) -> Outcome {
        let Completed {
            path,
            extractor,
            outcome,
            elapsed,
            permit,
        } = completed;
        drop(permit);

        match outcome {
            Ok(text) => {
                debug!(
                    path = %path.display(),
                    extractor = %extractor,
                    chars = text.chars().count(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "extraction succeeded"
                );
                Outcome::Emit(ExtractionResult::success(path, text, &extractor))
            }
            Err(error) if error.is_cancelled() => {
                debug!(path = %path.display(), "extraction observed cancellation");
                Outcome::Skip
            }
            Err(error) => self.fail(path, error, Some(&extractor), cancelled),
        }
    }

    /// Reports a failure, then converts it according to the error policy.
    /// Once cancelled, the run ends with `Cancelled` whatever the policy.
    fn fail(
        &self,
        path: PathBuf,
        error: ExtractError,
        extractor: Option<&str>,
        cancelled: bool,
    ) -> Outcome {
        self.sink.on_error(&path, &error, &error.user_message());

        if self.options.is_fail_fast() && !cancelled {
            Outcome::Abort(error)
        } else {
            Outcome::Emit(ExtractionResult::failure(path, &error, extractor))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::options::ErrorPolicy;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Claims `*.fake`. The file stem scripts the behavior: `fail` fails,
    /// `panic` panics, `slow` waits 300ms longer. Everything waits `delay`
    /// and honors cancellation while waiting, except `stubborn` stems.
    #[derive(Clone, Default)]
    struct Scripted {
        delay: Duration,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        started: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Extractor for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn can_handle(&self, path: &Path) -> bool {
            crate::extractor::has_extension(path, &["fake"])
        }

        async fn extract(
            &self,
            path: &Path,
            cancel: &CancellationSignal,
        ) -> Result<String, ExtractError> {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            if stem.contains("panic") {
                panic!("scripted panic for {}", stem);
            }

            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = if stem.contains("slow") {
                self.delay + Duration::from_millis(300)
            } else {
                self.delay
            };

            let finish = || {
                if stem.contains("fail") {
                    Err(ExtractError::decode(path, "scripted failure"))
                } else {
                    Ok(format!("text of {}", stem))
                }
            };
            let outcome = if stem.contains("stubborn") {
                tokio::time::sleep(delay).await;
                finish()
            } else {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => finish(),
                    _ = cancel.cancelled() => Err(ExtractError::Cancelled),
                }
            };

            self.running.fetch_sub(1, Ordering::SeqCst);
            outcome
        }
    }

    fn pipeline(scripted: &Scripted, options: ExtractionOptions) -> BatchPipeline {
        let mut registry = ExtractorRegistry::new();
        registry.register(scripted.clone());
        BatchPipeline::new(registry, options)
    }

    fn fake_paths(names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| PathBuf::from(format!("/batch/{}.fake", name)))
            .collect()
    }

    type Recorded = Arc<Mutex<Vec<(PathBuf, ErrorKind)>>>;

    fn recording_sink() -> (Arc<dyn ErrorSink>, Recorded) {
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let sink: Arc<dyn ErrorSink> = {
            let recorded = recorded.clone();
            Arc::new(move |path: &Path, cause: &ExtractError, _message: &str| {
                recorded
                    .lock()
                    .unwrap()
                    .push((path.to_path_buf(), cause.kind()));
            })
        };
        (sink, recorded)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_bound_is_respected() {
        let scripted = Scripted::with_delay(Duration::from_millis(30));
        let pipeline = pipeline(&scripted, ExtractionOptions::new().with_max_parallelism(2));
        let names: Vec<String> = (0..10).map(|i| format!("file{}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let results = pipeline
            .run(fake_paths(&names), CancellationSignal::new())
            .collect_all()
            .await
            .unwrap();

        assert_eq!(results.len(), 10);
        assert!(results.iter().all(ExtractionResult::succeeded));
        assert!(scripted.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(scripted.started.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_results_arrive_in_completion_order() {
        let scripted = Scripted::with_delay(Duration::ZERO);
        let pipeline = pipeline(&scripted, ExtractionOptions::new().with_max_parallelism(2));

        let results = pipeline
            .run(fake_paths(&["slow", "quick"]), CancellationSignal::new())
            .collect_all()
            .await
            .unwrap();

        let order: Vec<&str> = results.iter().map(|r| r.text()).collect();
        assert_eq!(order, vec!["text of quick", "text of slow"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_slot_leak_with_failures() {
        let scripted = Scripted::with_delay(Duration::ZERO);
        let (sink, recorded) = recording_sink();
        let pipeline =
            pipeline(&scripted, ExtractionOptions::new().with_max_parallelism(4)).with_error_sink(sink);

        let paths: Vec<PathBuf> = (0..1000)
            .map(|i| {
                let stem = if i % 3 == 2 {
                    format!("fail{}", i)
                } else {
                    format!("ok{}", i)
                };
                PathBuf::from(format!("/batch/{}.fake", stem))
            })
            .collect();

        let results = pipeline
            .run(paths, CancellationSignal::new())
            .collect_all()
            .await
            .unwrap();

        assert_eq!(results.len(), 1000);
        assert_eq!(results.iter().filter(|r| !r.succeeded()).count(), 333);
        assert_eq!(recorded.lock().unwrap().len(), 333);
        assert_eq!(pipeline.available_slots(), 4);

        let one_more = tokio::time::timeout(
            Duration::from_secs(5),
            pipeline
                .run(fake_paths(&["after"]), CancellationSignal::new())
                .collect_all(),
        )
        .await
        .expect("pipeline stalled")
        .unwrap();
        assert_eq!(one_more.len(), 1);
        assert!(one_more[0].succeeded());
    }

    #[tokio::test]
    async fn test_unsupported_paths_become_failed_results() {
        let (sink, recorded) = recording_sink();
        let pipeline = BatchPipeline::new(ExtractorRegistry::new(), ExtractionOptions::new())
            .with_error_sink(sink);

        let results = pipeline
            .run(
                vec![PathBuf::from("/a/one.doc"), PathBuf::from("/a/two.bin")],
                CancellationSignal::new(),
            )
            .collect_all()
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(!result.succeeded());
            assert_eq!(result.error_kind(), Some(ErrorKind::Unsupported));
            assert!(result.extractor().is_none());
        }
        assert_eq!(recorded.lock().unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unsupported_does_not_wait_for_a_slot() {
        let scripted = Scripted::with_delay(Duration::ZERO);
        let pipeline = pipeline(&scripted, ExtractionOptions::new().with_max_parallelism(1));

        let mut stream = pipeline.run(
            vec![
                PathBuf::from("/batch/slow.fake"),
                PathBuf::from("/batch/notes.unknown"),
            ],
            CancellationSignal::new(),
        );

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.error_kind(), Some(ErrorKind::Unsupported));
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.text(), "text of slow");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fail_fast_stops_after_first_failure() {
        let scripted = Scripted::with_delay(Duration::from_millis(5));
        let (sink, recorded) = recording_sink();
        let options = ExtractionOptions::new()
            .with_max_parallelism(1)
            .with_error_policy(ErrorPolicy::FailFast);
        let pipeline = pipeline(&scripted, options).with_error_sink(sink);

        let mut stream = pipeline.run(
            fake_paths(&["one", "two", "three-fail", "four", "five"]),
            CancellationSignal::new(),
        );

        let mut emitted = Vec::new();
        let mut aborted_with = None;
        while let Some(item) = stream.next().await {
            match item {
                Ok(result) => emitted.push(result.text().to_string()),
                Err(error) => aborted_with = Some(error),
            }
        }

        assert_eq!(emitted, vec!["text of one", "text of two"]);
        let error = aborted_with.expect("run should abort");
        assert_eq!(error.kind(), ErrorKind::DecodeFailure);
        assert_eq!(scripted.started.load(Ordering::SeqCst), 3);
        assert_eq!(recorded.lock().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fail_fast_discards_in_flight_results() {
        let scripted = Scripted::with_delay(Duration::from_millis(50));
        let options = ExtractionOptions::new()
            .with_max_parallelism(3)
            .with_error_policy(ErrorPolicy::FailFast);
        let pipeline = pipeline(&scripted, options);

        let items: Vec<_> = pipeline
            .run(
                fake_paths(&["fail", "slow1", "slow2", "slow3", "slow4"]),
                CancellationSignal::new(),
            )
            .collect()
            .await;

        assert_eq!(items.len(), 1);
        match &items[0] {
            Err(error) => assert_eq!(error.kind(), ErrorKind::DecodeFailure),
            Ok(result) => panic!("unexpected result for {}", result.path().display()),
        }
        assert_eq!(scripted.started.load(Ordering::SeqCst), 3);

        // Detached extractions return their slots when they finish.
        tokio::time::timeout(Duration::from_secs(2), async {
            while pipeline.available_slots() < 3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("slots should be released after detached extractions finish");
        assert_eq!(pipeline.available_slots(), 3);
        assert_eq!(scripted.running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancellation_wins_over_fail_fast() {
        let scripted = Scripted::with_delay(Duration::from_millis(200));
        let (sink, recorded) = recording_sink();
        let options = ExtractionOptions::new()
            .with_max_parallelism(2)
            .with_error_policy(ErrorPolicy::FailFast);
        let pipeline = pipeline(&scripted, options).with_error_sink(sink);

        let cancel = CancellationSignal::new();
        let mut stream = pipeline.run(
            fake_paths(&["stubborn-fail", "other", "later"]),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let mut items = Vec::new();
        while let Some(item) = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("stream should finish promptly")
        {
            items.push(item);
        }

        // The drained failure is reported as a result, then the run ends cancelled.
        assert_eq!(items.len(), 2);
        let failed = items[0].as_ref().unwrap();
        assert_eq!(failed.error_kind(), Some(ErrorKind::DecodeFailure));
        assert!(matches!(items[1], Err(ExtractError::Cancelled)));
        assert_eq!(recorded.lock().unwrap().len(), 1);
        assert_eq!(scripted.started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fail_fast_on_unsupported() {
        let options = ExtractionOptions::new().with_error_policy(ErrorPolicy::FailFast);
        let pipeline = BatchPipeline::new(ExtractorRegistry::new(), options);

        let err = pipeline
            .run(vec![PathBuf::from("/x/a.doc")], CancellationSignal::new())
            .collect_all()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancellation_drains_in_flight_and_stops_admission() {
        let scripted = Scripted::with_delay(Duration::from_secs(5));
        let (sink, recorded) = recording_sink();
        let pipeline =
            pipeline(&scripted, ExtractionOptions::new().with_max_parallelism(2)).with_error_sink(sink);
        let names: Vec<String> = (0..10).map(|i| format!("file{}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let cancel = CancellationSignal::new();
        let mut stream = pipeline.run(fake_paths(&names), cancel.clone());

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        let mut items = Vec::new();
        while let Some(item) = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("stream should finish promptly")
        {
            items.push(item);
        }

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ExtractError::Cancelled)));
        assert_eq!(scripted.started.load(Ordering::SeqCst), 2);
        assert!(recorded.lock().unwrap().is_empty());
        assert_eq!(pipeline.available_slots(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let scripted = Scripted::with_delay(Duration::ZERO);
        let pipeline = pipeline(&scripted, ExtractionOptions::new().with_max_parallelism(2));
        let cancel = CancellationSignal::new();
        cancel.cancel();

        let err = pipeline
            .run(fake_paths(&["a", "b"]), cancel)
            .collect_all()
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(scripted.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_extractor_fails_only_its_file() {
        let scripted = Scripted::with_delay(Duration::ZERO);
        let pipeline = pipeline(&scripted, ExtractionOptions::new().with_max_parallelism(2));

        let mut results = pipeline
            .run(fake_paths(&["panic", "fine"]), CancellationSignal::new())
            .collect_all()
            .await
            .unwrap();
        results.sort_by(|a, b| a.path().cmp(b.path()));

        assert_eq!(results.len(), 2);
        assert!(results[0].succeeded());
        assert!(!results[1].succeeded());
        assert_eq!(results[1].error_kind(), Some(ErrorKind::DecodeFailure));
        assert!(results[1].error_message().unwrap().contains("panicked"));
        assert_eq!(pipeline.available_slots(), 2);
    }

    struct ExplodingClaim;

    #[async_trait]
    impl Extractor for ExplodingClaim {
        fn name(&self) -> &str {
            "exploding"
        }

        fn can_handle(&self, path: &Path) -> bool {
            if crate::extractor::has_extension(path, &["boom"]) {
                panic!("cannot decide");
            }
            false
        }

        async fn extract(
            &self,
            _path: &Path,
            _cancel: &CancellationSignal,
        ) -> Result<String, ExtractError> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_panicking_can_handle_is_attributed_to_file() {
        let mut registry = ExtractorRegistry::new();
        registry.register(Scripted::default());
        registry.register(ExplodingClaim);
        let pipeline = BatchPipeline::new(registry, ExtractionOptions::new());

        let mut results = pipeline
            .run(
                vec![PathBuf::from("/x/a.boom"), PathBuf::from("/x/b.fake")],
                CancellationSignal::new(),
            )
            .collect_all()
            .await
            .unwrap();
        results.sort_by(|a, b| a.path().cmp(b.path()));

        assert_eq!(results[0].path(), Path::new("/x/a.boom"));
        assert_eq!(results[0].error_kind(), Some(ErrorKind::DecodeFailure));
        assert!(results[1].succeeded());
    }

    #[tokio::test]
    async fn test_relative_paths_are_made_absolute() {
        let scripted = Scripted::with_delay(Duration::ZERO);
        let pipeline = pipeline(&scripted, ExtractionOptions::new());

        let results = pipeline
            .run(vec![PathBuf::from("relative.fake")], CancellationSignal::new())
            .collect_all()
            .await
            .unwrap();
        assert!(results[0].path().is_absolute());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dropping_stream_releases_slots() {
        let scripted = Scripted::with_delay(Duration::from_secs(10));
        let pipeline = pipeline(&scripted, ExtractionOptions::new().with_max_parallelism(3));
        let names: Vec<String> = (0..6).map(|i| format!("file{}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let stream = pipeline.run(fake_paths(&names), CancellationSignal::new());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(pipeline.available_slots(), 0);
        drop(stream);

        tokio::time::timeout(Duration::from_secs(2), async {
            while pipeline.available_slots() != 3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("slots should be released after the stream is dropped");
    }

    #[tokio::test]
    async fn test_stream_trait_yields_all_results() {
        let scripted = Scripted::with_delay(Duration::ZERO);
        let pipeline = pipeline(&scripted, ExtractionOptions::new().with_max_parallelism(2));

        let items: Vec<StreamItem> = pipeline
            .run(fake_paths(&["a", "b", "c"]), CancellationSignal::new())
            .collect()
            .await;
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|item| item.is_ok()));
    }

    #[tokio::test]
    async fn test_empty_source_ends_immediately() {
        let pipeline = BatchPipeline::new(ExtractorRegistry::new(), ExtractionOptions::new());
        let results = pipeline
            .run(Vec::<PathBuf>::new(), CancellationSignal::new())
            .collect_all()
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
