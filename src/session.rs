// src/session.rs

use crate::allocation::People;
use crate::config::Config;
use crate::error::{Result, SplitError};
use crate::model::{BankAccount, Item, Person};
use crate::normalize::normalize_items;
use crate::ocr::{OcrEngine, TesseractEngine, read_receipt};
use crate::registry::BillRegistry;
use crate::structuring::{self, ReceiptStructurer, structure_receipt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{Instrument, error, info, info_span};

/// Where a session is in its lifecycle. Derived from its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    ItemsLoaded,
    PeopleAssigned,
}

/// Runs the image → text → items pipeline. At most one ingestion may be in
/// flight per ingestor.
pub struct Ingestor {
    ocr: Box<dyn OcrEngine>,
    structurer: Box<dyn ReceiptStructurer>,
    ocr_timeout: Option<Duration>,
    max_chars: usize,
    busy: AtomicBool,
}

/// Clears the busy flag when the ingestion attempt ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Ingestor {
    pub fn new(ocr: Box<dyn OcrEngine>, structurer: Box<dyn ReceiptStructurer>) -> Self {
        Self {
            ocr,
            structurer,
            ocr_timeout: None,
            max_chars: 12_000,
            busy: AtomicBool::new(false),
        }
    }

    /// Tesseract plus the configured structuring backend.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let structurer = structuring::backend_from_config(&cfg.structuring)?;
        Ok(Self::new(Box::new(TesseractEngine::from_config(&cfg.ocr)), structurer)
            .with_ocr_timeout(cfg.ocr.timeout())
            .with_max_chars(cfg.structuring.max_chars))
    }

    pub fn with_ocr_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ocr_timeout = timeout;
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Result<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SplitError::Busy)?;
        Ok(BusyGuard(&self.busy))
    }

    /// Recognize and structure one receipt image into canonical items.
    ///
    /// Fails with `Busy` if another ingestion on this ingestor is pending.
    pub async fn ingest(&self, image: Option<&[u8]>) -> Result<Vec<Item>> {
        let image = image.ok_or(SplitError::InputMissing)?;
        let _guard = self.try_begin()?;

        let span = info_span!("ingest", bytes = image.len(), backend = self.structurer.name());
        async {
            let raw_text = read_receipt(self.ocr.as_ref(), image, self.ocr_timeout).await?;
            self.ingest_text_inner(&raw_text).await
        }
        .instrument(span)
        .await
    }

    /// Structure already-extracted text. Shares the busy flag with `ingest`.
    pub async fn ingest_text(&self, raw_text: &str) -> Result<Vec<Item>> {
        let _guard = self.try_begin()?;
        self.ingest_text_inner(raw_text)
            .instrument(info_span!("ingest_text", chars = raw_text.len()))
            .await
    }

    async fn ingest_text_inner(&self, raw_text: &str) -> Result<Vec<Item>> {
        let raw_items = structure_receipt(self.structurer.as_ref(), raw_text, self.max_chars).await?;
        let items = normalize_items(&raw_items);
        info!(count = items.len(), "Receipt items normalized");
        Ok(items)
    }
}

/// The bill being split and the people it is split between.
#[derive(Debug, Default)]
pub struct Session {
    registry: BillRegistry,
    people: People,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        if !self.people.is_empty() {
            SessionState::PeopleAssigned
        } else if !self.registry.is_empty() {
            SessionState::ItemsLoaded
        } else {
            SessionState::Empty
        }
    }

    pub fn registry(&self) -> &BillRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BillRegistry {
        &mut self.registry
    }

    pub fn people(&self) -> &People {
        &self.people
    }

    /// Run one ingestion and add its items to the bill. Nothing is added if
    /// any step fails.
    pub async fn ingest(&mut self, ingestor: &Ingestor, image: Option<&[u8]>) -> Result<usize> {
        let outcome = ingestor.ingest(image).await;
        self.commit(outcome)
    }

    /// Like [`ingest`](Self::ingest) for text that has already been extracted.
    pub async fn ingest_text(&mut self, ingestor: &Ingestor, raw_text: &str) -> Result<usize> {
        let outcome = ingestor.ingest_text(raw_text).await;
        self.commit(outcome)
    }

    fn commit(&mut self, outcome: Result<Vec<Item>>) -> Result<usize> {
        match outcome {
            Ok(items) => {
                let count = items.len();
                self.registry.extend(items);
                Ok(count)
            }
            Err(e) => {
                error!(error = %e, "Ingestion failed, bill unchanged");
                Err(e)
            }
        }
    }

    pub fn add_item(&mut self, item: Item) {
        self.registry.add_item(item);
    }

    pub fn remove_item(&mut self, index: usize) -> Option<Item> {
        self.registry.remove_item(index)
    }

    pub fn update_quantity(&mut self, index: usize, raw: &str) -> bool {
        self.registry.update_quantity(index, raw)
    }

    /// Snapshot the items at `indices` and assign them to a new person.
    /// A repeated index charges the item once. Any index past the end of the
    /// bill fails with `Validation` and nobody is added.
    pub fn assign(
        &mut self,
        name: &str,
        phone: &str,
        indices: &[usize],
        tip_percent: f64,
        banks: Vec<BankAccount>,
    ) -> Result<&Person> {
        if let Some(missing) = self.registry.first_missing(indices) {
            return Err(SplitError::Validation(format!(
                "{name}: no item at index {missing}"
            )));
        }
        let snapshot = self.registry.select_snapshot(indices);
        self.people.add(name, phone, snapshot, tip_percent, banks)
    }

    pub fn remove_person(&mut self, index: usize) -> Option<Person> {
        self.people.remove(index)
    }

    /// Drop all items and people.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.people.clear();
        info!("Session reset");
    }
}
