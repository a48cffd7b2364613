/// A half-open offset range requested from a paginated source in one fetch.
///
/// Windows produced for one run are non-overlapping and monotonically
/// increasing; each is consumed by exactly one fetch and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset_start: u64,
    pub offset_end: u64,
}

impl PageWindow {
    pub fn new(offset_start: u64, offset_end: u64) -> Self {
        Self {
            offset_start,
            offset_end,
        }
    }

    pub fn len(&self) -> u64 {
        self.offset_end.saturating_sub(self.offset_start)
    }

    pub fn is_empty(&self) -> bool {
        self.offset_end <= self.offset_start
    }
}

/// What the first page response tells us about the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirstPageOutcome {
    /// The source's total is unchanged since the previous run. The caller
    /// must discard the first page too: re-ingesting it would duplicate
    /// rows in an incremental sink.
    NoNewData,
    /// Remaining windows beyond the first page. Empty when the first page
    /// already covers everything (including a source reporting zero items).
    Windows(Vec<PageWindow>),
}

/// Plans the minimal set of page fetches covering only unseen data.
///
/// The first request always asks for `[0, page_size)`. The source-reported
/// total on that response is the authoritative upper bound; when the
/// previous run's total is known, only the difference is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPlanner {
    page_size: u64,
}

impl PaginationPlanner {
    /// A zero `page_size` is clamped to one: window generation must always
    /// advance the cursor.
    pub fn new(page_size: u64) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn plan_first_request(&self) -> PageWindow {
        PageWindow::new(0, self.page_size)
    }

    /// Emits the remaining windows once the first response reported
    /// `total_count`.
    ///
    /// The emitted windows partition `[page_size, effective_total)` exactly,
    /// where `effective_total` is `total_count` less the previous run's
    /// count when known. The final window is clipped rather than extended a
    /// full `page_size` past the total.
    pub fn on_first_response(
        &self,
        total_count: u64,
        previous_total_count: Option<u64>,
    ) -> FirstPageOutcome {
        if let Some(previous) = previous_total_count {
            // A total below the previous count means the source shrank;
            // there is nothing new to fetch either way.
            if total_count <= previous {
                return FirstPageOutcome::NoNewData;
            }
        }

        let effective_total = match previous_total_count {
            Some(previous) => total_count - previous,
            None => total_count,
        };

        let mut windows = Vec::new();
        let mut cursor = self.page_size;
        while cursor < effective_total {
            let end = (cursor + self.page_size).min(effective_total);
            windows.push(PageWindow::new(cursor, end));
            cursor = end;
        }
        FirstPageOutcome::Windows(windows)
    }
}
