use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bigdecimal::BigDecimal;
use futures::stream::{self, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

use super::draft_store::DraftStore;
use crate::domain::order::BuilderSnapshot;
use crate::domain::ports::{CatalogLookup, PreviewSink};
use crate::domain::preview::{CombinedCard, Preview, ProductCard};
use crate::domain::pricing::aggregate;
use crate::domain::product::ProductId;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);
pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    /// Timer armed, waiting for the input burst to settle.
    Pending,
    /// A preview cycle is in flight.
    Running,
}

/// Everything a preview cycle needs besides the snapshot itself.
#[derive(Clone)]
pub struct PreviewContext {
    pub catalog: Arc<dyn CatalogLookup>,
    pub drafts: DraftStore,
    pub sink: Arc<dyn PreviewSink>,
    pub concurrency: usize,
}

/// Builds the preview for `snapshot`.
///
/// Detailed rows are merged per product id (first-seen order) and every
/// distinct product is looked up once. A failed lookup drops that product's
/// card and is logged; the rest of the preview is still produced.
pub async fn build_preview(
    catalog: &dyn CatalogLookup,
    snapshot: &BuilderSnapshot,
    concurrency: usize,
) -> Preview {
    let mut order: Vec<ProductId> = Vec::new();
    let mut quantities: HashMap<ProductId, i64> = HashMap::new();
    for (_, row) in &snapshot.detailed {
        let entry = quantities.entry(row.product_id.clone()).or_insert_with(|| {
            order.push(row.product_id.clone());
            0
        });
        *entry = entry.saturating_add(row.quantity);
    }

    let lookups: Vec<_> = stream::iter(order)
        .map(|id| async move {
            let result = catalog.find_product(&id).await;
            (id, result)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut products = Vec::with_capacity(lookups.len());
    for (id, result) in lookups {
        let product = match result {
            Ok(product) => product,
            Err(e) => {
                log::error!("Preview lookup for product {id} failed: {e}");
                continue;
            }
        };
        let quantity = quantities.get(&id).copied().unwrap_or_default();
        products.push(ProductCard {
            line_total: &product.price * BigDecimal::from(quantity),
            unit_price: product.price,
            product_name: product.product_name,
            bar_code: product.bar_code,
            image_path: product.image_path,
            product_id: id,
            quantity,
        });
    }

    let combined = snapshot
        .combined
        .iter()
        .filter_map(|(_, row)| {
            let derived = row.derived.as_ref()?;
            Some(CombinedCard {
                brand: row.brand.clone(),
                category: row.category.clone(),
                quantity: row.quantity,
                total_items: derived.total_items,
                total_price: derived.total_price.clone(),
            })
        })
        .collect();

    Preview {
        products,
        combined,
        totals: aggregate(
            snapshot.detailed.iter().map(|(_, row)| row),
            snapshot.combined.iter().map(|(_, row)| row),
        ),
    }
}

/// One full cycle: build, render, persist.
async fn run_cycle(ctx: &PreviewContext, snapshot: &BuilderSnapshot) {
    let preview = build_preview(ctx.catalog.as_ref(), snapshot, ctx.concurrency).await;
    ctx.sink.render(&preview);
    if let Err(e) = ctx.drafts.save(&snapshot.to_draft()) {
        log::error!("Failed to persist order draft: {e}");
    }
    log::debug!(
        "Preview cycle done: {} product cards, {} combined cards",
        preview.products.len(),
        preview.combined.len()
    );
}

/// Cancellable one-shot deadline.
struct DebounceTimer {
    window: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// (Re)arms the timer, replacing any earlier deadline.
    fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Resolves when the armed deadline passes; never resolves while disarmed.
    async fn fired(&self) {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

enum Command {
    Change(u64, BuilderSnapshot),
    /// Drop any pending change and remove the stored draft.
    Discard(u64),
}

/// Coalesces bursts of builder changes into single preview cycles.
///
/// At most one cycle runs at a time. Changes that arrive while a cycle is
/// running re-arm the timer once that cycle completes, so the last state is
/// always previewed and persisted. The debounce task is the only writer of
/// the draft slot.
pub struct PreviewDebouncer {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<DebounceState>,
    completed: watch::Receiver<u64>,
    generation: AtomicU64,
}

impl PreviewDebouncer {
    /// Spawns the debounce task on the current tokio runtime. The task ends
    /// once the debouncer is dropped, after flushing a pending change.
    pub fn spawn(ctx: PreviewContext, window: Duration) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(DebounceState::Idle);
        let (completed_tx, completed_rx) = watch::channel(0);

        let task = DebounceTask {
            ctx,
            timer: DebounceTimer::new(window),
            latest: None,
            state: state_tx,
            completed: completed_tx,
        };
        tokio::spawn(task.run(commands_rx));

        Self {
            commands: commands_tx,
            state: state_rx,
            completed: completed_rx,
            generation: AtomicU64::new(0),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Records a qualifying change.
    pub fn notify(&self, snapshot: BuilderSnapshot) {
        let generation = self.next_generation();
        if self.commands.send(Command::Change(generation, snapshot)).is_err() {
            log::warn!("Preview debouncer has stopped; change {generation} not previewed");
        }
    }

    /// Cancels a pending cycle and removes the stored draft once any running
    /// cycle has finished.
    pub fn discard(&self) {
        let generation = self.next_generation();
        if self.commands.send(Command::Discard(generation)).is_err() {
            log::warn!("Preview debouncer has stopped; draft not discarded");
        }
    }

    pub fn state(&self) -> DebounceState {
        *self.state.borrow()
    }

    /// Waits until every command sent so far has been carried out.
    pub async fn settle(&self) {
        let target = self.generation.load(Ordering::SeqCst);
        let mut completed = self.completed.clone();
        if completed.wait_for(|done| *done >= target).await.is_err() {
            log::warn!("Preview debouncer stopped before settling");
        }
    }
}

struct DebounceTask {
    ctx: PreviewContext,
    timer: DebounceTimer,
    latest: Option<(u64, BuilderSnapshot)>,
    state: watch::Sender<DebounceState>,
    completed: watch::Sender<u64>,
}

impl DebounceTask {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                next = commands.recv() => match next {
                    Some(command) => self.accept(command),
                    None => {
                        self.timer.cancel();
                        self.fire().await;
                        self.state.send_replace(DebounceState::Idle);
                        return;
                    }
                },
                _ = self.timer.fired() => {
                    self.timer.cancel();
                    self.fire().await;
                    while let Ok(command) = commands.try_recv() {
                        self.accept(command);
                    }
                    if self.latest.is_none() {
                        self.state.send_replace(DebounceState::Idle);
                    }
                }
            }
        }
    }

    fn accept(&mut self, command: Command) {
        match command {
            Command::Change(generation, snapshot) => {
                self.latest = Some((generation, snapshot));
                self.timer.arm();
                self.state.send_replace(DebounceState::Pending);
            }
            Command::Discard(generation) => {
                self.latest = None;
                self.timer.cancel();
                if let Err(e) = self.ctx.drafts.clear() {
                    log::error!("Failed to clear order draft: {e}");
                }
                self.completed.send_replace(generation);
                self.state.send_replace(DebounceState::Idle);
            }
        }
    }

    async fn fire(&mut self) {
        let Some((generation, snapshot)) = self.latest.take() else {
            return;
        };
        self.state.send_replace(DebounceState::Running);
        run_cycle(&self.ctx, &snapshot).await;
        self.completed.send_replace(generation);
    }
}

/// Keeps the most recent preview for whoever displays it.
#[derive(Debug, Default)]
pub struct LatestPreview {
    latest: Mutex<Option<Preview>>,
    renders: AtomicU64,
}

impl LatestPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<Preview> {
        self.latest.lock().ok().and_then(|p| p.clone())
    }

    pub fn renders(&self) -> u64 {
        self.renders.load(Ordering::SeqCst)
    }
}

impl PreviewSink for LatestPreview {
    fn render(&self, preview: &Preview) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(preview.clone());
        }
        self.renders.fetch_add(1, Ordering::SeqCst);
    }
}
