use serde::Serialize;

// Fixed by the catalog.
pub const PAGE_SIZE: u32 = 10;

const WINDOW_DELTA: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "page", rename_all = "snake_case")]
pub enum PageItem {
    Page(u32),
    Gap,
}

pub fn total_pages(total_results: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_results.div_ceil(page_size as u64);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

pub fn has_previous(current: u32) -> bool {
    current > 1
}

pub fn has_next(current: u32, total_pages: u32) -> bool {
    current < total_pages
}

// First page, last page and current +/- 2. A hole of one page is filled in,
// anything wider becomes a single Gap.
pub fn page_window(current: u32, total_pages: u32) -> Vec<PageItem> {
    if total_pages <= 1 {
        return Vec::new();
    }
    let low = current.saturating_sub(WINDOW_DELTA).max(2);
    let high = current.saturating_add(WINDOW_DELTA).min(total_pages - 1);

    let shown = std::iter::once(1)
        .chain(low..=high)
        .chain(std::iter::once(total_pages));

    let mut items = Vec::new();
    let mut last: Option<u32> = None;
    for page in shown {
        if let Some(prev) = last {
            match page - prev {
                1 => {}
                2 => items.push(PageItem::Page(prev + 1)),
                _ => items.push(PageItem::Gap),
            }
        }
        items.push(PageItem::Page(page));
        last = Some(page);
    }
    items
}
