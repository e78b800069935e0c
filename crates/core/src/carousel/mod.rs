//! Ordered, persistent sequence of carousel pages.

pub mod snapshot;

use std::fmt;

use crate::assets::ContentLookup;
use crate::config::CarouselConfig;
use crate::scene::ContentInstance;
use crate::timeline::{Easing, Tween};
use crate::{CatalogError, Result};

pub use snapshot::{
    JsonFileStore, MemoryStore, PageRecord, PageSnapshot, SnapshotStore, SNAPSHOT_VERSION,
};

#[derive(Debug)]
pub struct Page {
    pub index: usize,
    pub content: ContentInstance,
    pub scan_code: Option<String>,
}

impl Page {
    pub fn is_home(&self) -> bool {
        self.index == 0
    }
}

/// Result of a carousel operation. Anything other than `Applied` or
/// `Deleted` left the carousel untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselOutcome {
    Applied,
    /// The current page was removed. `reset_to_home` is set when the
    /// carousel collapsed to the home page and is scrolling back to it.
    Deleted { reset_to_home: bool },
    /// The transition guard is held.
    Contended,
    /// A page for this scan code already exists.
    AlreadyPresent,
    /// The home page cannot be deleted.
    HomePinned,
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Scroll,
    Compaction,
}

/// Page 0 is the permanent home page and indices stay contiguous. One
/// transition guard covers scrolls and compaction; structural changes are
/// rejected while it is held.
pub struct CarouselStore {
    config: CarouselConfig,
    page_spacing: f32,
    pages: Vec<Page>,
    current_index: usize,
    container_offset: f32,
    scroll: Option<Tween>,
    transition: Option<Transition>,
    snapshots: Box<dyn SnapshotStore>,
}

impl CarouselStore {
    /// Creates a carousel holding only the home page.
    pub fn init_home(
        config: CarouselConfig,
        mut home: ContentInstance,
        snapshots: Box<dyn SnapshotStore>,
    ) -> Self {
        home.place(0.0);
        Self {
            page_spacing: config.page_spacing(),
            config,
            pages: vec![Page {
                index: 0,
                content: home,
                scan_code: None,
            }],
            current_index: 0,
            container_offset: 0.0,
            scroll: None,
            transition: None,
            snapshots,
        }
    }

    /// Rebuilds the carousel from the persisted snapshot.
    ///
    /// Records are replayed in ascending index order. Records that no longer
    /// resolve, repeat an earlier scan code, or fall outside the persisted
    /// page count are dropped; the survivors are compacted and the healed
    /// snapshot is written back.
    pub fn restore(
        config: CarouselConfig,
        home: ContentInstance,
        snapshots: Box<dyn SnapshotStore>,
        lookup: &dyn ContentLookup,
    ) -> Result<Self> {
        let mut store = Self::init_home(config, home, snapshots);

        let snapshot = match store.snapshots.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Ok(store),
            Err(err) => {
                tracing::warn!(%err, "ignoring unreadable page snapshot");
                return Ok(store);
            }
        };

        let mut records = snapshot.records;
        records.sort_by_key(|record| record.index);
        let mut healed = snapshot.total_pages != records.len() + 1;
        let mut last_index = 0;

        for record in records {
            let scan_code = record.scan_code.filter(|code| !code.is_empty());
            let in_range = record.index > last_index && record.index < snapshot.total_pages;
            let duplicate = scan_code
                .as_deref()
                .is_some_and(|code| store.contains_scan_code(code));

            let content = if in_range && !duplicate {
                lookup.instantiate(&record.content_id)
            } else {
                None
            };
            let Some(content) = content else {
                tracing::warn!(
                    index = record.index,
                    content_id = %record.content_id,
                    "dropping stale page record"
                );
                healed = true;
                continue;
            };

            last_index = record.index;
            let index = store.pages.len();
            if index != record.index {
                healed = true;
            }
            store.insert_at(content, index, scan_code)?;
        }

        if healed {
            tracing::info!(total_pages = store.total_pages(), "compacted persisted pages");
            store.persist()?;
        }
        Ok(store)
    }

    /// Places content at a specific index during startup replay. The index
    /// must be an existing page (replaced) or the next free one; other pages
    /// never move. Nothing is persisted.
    pub fn insert_at(
        &mut self,
        mut content: ContentInstance,
        index: usize,
        scan_code: Option<String>,
    ) -> Result<()> {
        if index == 0 || index > self.pages.len() {
            return Err(CatalogError::InvalidIndex {
                index,
                max: self.pages.len(),
            });
        }

        content.place(self.placement_for(index));
        let page = Page {
            index,
            content,
            scan_code,
        };
        if index == self.pages.len() {
            self.pages.push(page);
        } else {
            let replaced = std::mem::replace(&mut self.pages[index], page);
            replaced.content.destroy();
        }
        Ok(())
    }

    /// Adds a page after the last one and persists the carousel. An error
    /// means the page was added but the snapshot could not be written.
    pub fn append(
        &mut self,
        mut content: ContentInstance,
        scan_code: Option<String>,
    ) -> Result<CarouselOutcome> {
        if self.is_transitioning() {
            tracing::debug!("append ignored while a transition is running");
            return Ok(CarouselOutcome::Contended);
        }
        if let Some(code) = scan_code.as_deref() {
            if self.contains_scan_code(code) {
                content.destroy();
                return Ok(CarouselOutcome::AlreadyPresent);
            }
        }

        let index = self.pages.len();
        content.place(self.placement_for(index));
        tracing::info!(index, content_id = content.content_id(), "appending page");
        self.pages.push(Page {
            index,
            content,
            scan_code,
        });
        self.persist()?;
        Ok(CarouselOutcome::Applied)
    }

    /// Scrolls to `target`. The logical position changes immediately; the
    /// guard stays held until the scroll animation completes.
    pub fn navigate(&mut self, target: usize) -> CarouselOutcome {
        if self.is_transitioning() {
            tracing::debug!(target, "navigation ignored while a transition is running");
            return CarouselOutcome::Contended;
        }
        if target >= self.pages.len() {
            return CarouselOutcome::OutOfRange;
        }

        self.scroll_to(target);
        self.transition = Some(Transition::Scroll);
        CarouselOutcome::Applied
    }

    /// Deletes the current page and compacts the pages behind it. As with
    /// [`append`](Self::append), an error only reports a failed save.
    pub fn request_delete(&mut self) -> Result<CarouselOutcome> {
        if self.is_transitioning() {
            tracing::debug!("delete ignored while a transition is running");
            return Ok(CarouselOutcome::Contended);
        }
        let index = self.current_index;
        if index == 0 {
            return Ok(CarouselOutcome::HomePinned);
        }

        let removed = self.pages.remove(index);
        tracing::info!(index, content_id = removed.content.content_id(), "deleting page");
        removed.content.destroy();

        if self.pages.len() == 1 {
            self.scroll_to(0);
            self.transition = Some(Transition::Scroll);
            self.persist()?;
            return Ok(CarouselOutcome::Deleted {
                reset_to_home: true,
            });
        }

        let shift_seconds = self.config.shift_seconds;
        for position in index..self.pages.len() {
            let x = self.placement_for(position);
            let page = &mut self.pages[position];
            page.index = position;
            page.content.slide_to(x, shift_seconds);
        }
        if index >= self.pages.len() {
            // The last page went away; follow the new last page.
            self.scroll_to(self.pages.len() - 1);
        }
        self.transition = Some(Transition::Compaction);
        self.persist()?;

        Ok(CarouselOutcome::Deleted {
            reset_to_home: false,
        })
    }

    /// Advances running animations. Returns `true` on the tick the
    /// transition guard is released.
    pub fn tick(&mut self, dt: f32) -> bool {
        if let Some(scroll) = self.scroll.as_mut() {
            self.container_offset = scroll.advance(dt);
            if scroll.is_finished() {
                self.scroll = None;
            }
        }
        for page in &mut self.pages {
            page.content.advance(dt);
        }

        let settled = self.scroll.is_none() && self.pages.iter().all(|page| !page.content.is_sliding());
        if settled {
            if let Some(transition) = self.transition.take() {
                tracing::debug!(?transition, index = self.current_index, "carousel settled");
                return true;
            }
        }
        false
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn current_scan_code(&self) -> Option<&str> {
        self.pages
            .get(self.current_index)
            .and_then(|page| page.scan_code.as_deref())
    }

    /// Horizontal offset of the page container.
    pub fn container_offset(&self) -> f32 {
        self.container_offset
    }

    pub fn page_spacing(&self) -> f32 {
        self.page_spacing
    }

    pub fn contains_scan_code(&self, scan_code: &str) -> bool {
        self.pages
            .iter()
            .any(|page| page.scan_code.as_deref() == Some(scan_code))
    }

    pub fn contains_content(&self, content_id: &str) -> bool {
        self.pages
            .iter()
            .filter(|page| !page.is_home())
            .any(|page| page.content.content_id() == content_id)
    }

    pub fn snapshot(&self) -> PageSnapshot {
        let records = self
            .pages
            .iter()
            .filter(|page| !page.is_home())
            .map(|page| PageRecord {
                index: page.index,
                content_id: page.content.content_id().to_string(),
                scan_code: page.scan_code.clone(),
            })
            .collect();
        PageSnapshot::new(self.pages.len(), records)
    }

    fn persist(&mut self) -> Result<()> {
        let snapshot = self.snapshot();
        self.snapshots.save(&snapshot)
    }

    fn scroll_to(&mut self, target: usize) {
        let offset = -(target as f32) * self.page_spacing;
        self.scroll = Some(Tween::new(
            self.container_offset,
            offset,
            self.config.transition_seconds,
            Easing::InOutQuad,
        ));
        self.current_index = target;
    }

    fn placement_for(&self, index: usize) -> f32 {
        index as f32 * self.page_spacing
    }
}

impl fmt::Debug for CarouselStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CarouselStore")
            .field("pages", &self.pages.len())
            .field("current_index", &self.current_index)
            .field("transition", &self.transition)
            .field("container_offset", &self.container_offset)
            .finish()
    }
}
