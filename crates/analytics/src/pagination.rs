use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staking_model::Staker;

pub const DEFAULT_ITEMS_PER_PAGE: usize = 15;

/// Pages beyond which the window collapses the gap to page 1 / the last page.
const EDGE_SPAN: usize = 3;

/// Up to this many pages every page is listed and nothing is elided.
const SHOW_ALL_PAGES: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

pub fn total_pages(len: usize, items_per_page: usize) -> usize {
    len.div_ceil(items_per_page.max(1))
}

/// Page navigation over a list of known length. Pages are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginator {
    current_page: usize,
    items_per_page: usize,
    total_pages: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_ITEMS_PER_PAGE)
    }
}

impl Paginator {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            current_page: 1,
            items_per_page: items_per_page.max(1),
            total_pages: 0,
        }
    }

    pub fn with_len(items_per_page: usize, len: usize) -> Self {
        let mut paginator = Self::new(items_per_page);
        paginator.set_len(len);
        paginator
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Recomputes the page count for a new list and pulls the current page
    /// back inside it.
    pub fn set_len(&mut self, len: usize) {
        self.total_pages = total_pages(len, self.items_per_page);
        self.current_page = self.clamp(self.current_page as i64);
    }

    /// `list[(page-1)*n .. page*n]`. Does not clamp `page`; a page outside
    /// the list yields an empty slice.
    pub fn slice<'a, T>(&self, list: &'a [T], page: usize) -> &'a [T] {
        let Some(start) = page
            .checked_sub(1)
            .and_then(|p| p.checked_mul(self.items_per_page))
        else {
            return &[];
        };
        if start >= list.len() {
            return &[];
        }
        let end = start.saturating_add(self.items_per_page).min(list.len());
        &list[start..end]
    }

    pub fn current_slice<'a, T>(&self, list: &'a [T]) -> &'a [T] {
        self.slice(list, self.current_page)
    }

    pub fn go_to_first(&mut self) {
        self.current_page = 1;
    }

    pub fn go_to_last(&mut self) {
        self.current_page = self.last_page();
    }

    pub fn next(&mut self) {
        self.current_page = self.clamp(self.current_page as i64 + 1);
    }

    pub fn previous(&mut self) {
        self.current_page = self.clamp(self.current_page as i64 - 1);
    }

    /// Commits `page` clamped into `[1, total_pages]`. Ignored while there
    /// are no pages.
    pub fn jump_to_page(&mut self, page: i64) -> bool {
        if self.total_pages == 0 {
            return false;
        }
        self.current_page = self.clamp(page);
        true
    }

    /// Raw text from a page input. Anything that is not an integer leaves
    /// the current page untouched.
    pub fn jump_to(&mut self, input: &str) -> bool {
        match input.trim().parse::<i64>() {
            Ok(page) => self.jump_to_page(page),
            Err(_) => false,
        }
    }

    /// Page list for navigation. With at most seven pages every page is
    /// listed. Otherwise it is compact: page 1, an ellipsis when the
    /// current page is more than three pages from the start, up to three
    /// neighbouring pages, an ellipsis when more than three pages from the
    /// end, then the last page. At the first and last page the neighbours
    /// shift inward so two of them are still shown.
    pub fn visible_pages(&self) -> Vec<PageItem> {
        let total = self.total_pages;
        if total <= SHOW_ALL_PAGES {
            return (1..=total).map(PageItem::Page).collect();
        }
        let current = self.current_page;
        let mut items = vec![PageItem::Page(1)];
        if current > EDGE_SPAN + 1 {
            items.push(PageItem::Ellipsis);
        }

        let lo = current.saturating_sub(1).min(total.saturating_sub(2)).max(2);
        let hi = (current + 1).max(3).min(total - 1);
        items.extend((lo..=hi).map(PageItem::Page));

        if current + EDGE_SPAN < total {
            items.push(PageItem::Ellipsis);
        }
        if total > 1 {
            items.push(PageItem::Page(total));
        }
        items
    }

    fn last_page(&self) -> usize {
        self.total_pages.max(1)
    }

    fn clamp(&self, page: i64) -> usize {
        page.clamp(1, self.last_page() as i64) as usize
    }
}

/// One table row of the ranked staker list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRow {
    pub rank: usize,
    pub leader: bool,
    pub wallet: String,
    pub short_wallet: String,
    pub staking_power: f64,
    pub amount_staked: f64,
    pub staked_at: Option<DateTime<Utc>>,
    pub unlocks_at: Option<DateTime<Utc>>,
    pub duration_days: i64,
}

/// Rows of `page`, ranked by position in the full list.
pub fn ranked_rows(stakers: &[Staker], paginator: &Paginator, page: usize) -> Vec<RankedRow> {
    let offset = page.saturating_sub(1).saturating_mul(paginator.items_per_page());
    paginator
        .slice(stakers, page)
        .iter()
        .enumerate()
        .map(|(index, staker)| {
            let rank = offset + index + 1;
            RankedRow {
                rank,
                leader: rank == 1,
                wallet: staker.wallet.clone(),
                short_wallet: staker.short_wallet(),
                staking_power: staker.staking_power,
                amount_staked: staker.amount_staked,
                staked_at: staker.staked_at(),
                unlocks_at: staker.unlocks_at(),
                duration_days: staker.duration_days(),
            }
        })
        .collect()
}

/// Everything a table view needs to draw the current page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageView {
    pub page: usize,
    pub total_pages: usize,
    pub items_per_page: usize,
    pub window: Vec<PageItem>,
    pub rows: Vec<RankedRow>,
}

impl PageView {
    pub fn build(stakers: &[Staker], paginator: &Paginator) -> Self {
        Self {
            page: paginator.current_page(),
            total_pages: paginator.total_pages(),
            items_per_page: paginator.items_per_page(),
            window: paginator.visible_pages(),
            rows: ranked_rows(stakers, paginator, paginator.current_page()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageItem::{Ellipsis, Page};

    fn numbers(len: usize) -> Vec<usize> {
        (0..len).collect()
    }

    fn at(current: usize, total: usize) -> Paginator {
        let mut paginator = Paginator::with_len(1, total);
        assert!(paginator.jump_to_page(current as i64));
        paginator
    }

    #[test]
    fn splits_list_into_pages() {
        let list = numbers(25);
        let paginator = Paginator::with_len(10, list.len());
        assert_eq!(paginator.total_pages(), 3);
        assert_eq!(paginator.slice(&list, 1), &list[0..10]);
        assert_eq!(paginator.slice(&list, 3), &[20, 21, 22, 23, 24]);
    }

    #[test]
    fn out_of_range_pages_are_empty_not_clamped() {
        let list = numbers(25);
        let paginator = Paginator::with_len(10, list.len());
        assert!(paginator.slice(&list, 0).is_empty());
        assert!(paginator.slice(&list, 4).is_empty());
        assert!(paginator.slice(&list, usize::MAX).is_empty());
    }

    #[test]
    fn empty_list_has_no_pages() {
        let mut paginator = Paginator::with_len(10, 0);
        assert_eq!(paginator.total_pages(), 0);
        assert_eq!(paginator.current_page(), 1);
        assert!(paginator.visible_pages().is_empty());
        paginator.next();
        paginator.go_to_last();
        assert_eq!(paginator.current_page(), 1);
        assert!(!paginator.jump_to("3"));
        assert!(paginator.current_slice::<usize>(&[]).is_empty());
    }

    #[test]
    fn next_and_previous_stop_at_the_edges() {
        let mut paginator = Paginator::with_len(10, 25);
        paginator.previous();
        assert_eq!(paginator.current_page(), 1);
        paginator.next();
        paginator.next();
        paginator.next();
        assert_eq!(paginator.current_page(), 3);
        paginator.go_to_first();
        assert_eq!(paginator.current_page(), 1);
        paginator.go_to_last();
        assert_eq!(paginator.current_page(), 3);
    }

    #[test]
    fn jump_to_parses_and_clamps() {
        let mut paginator = Paginator::with_len(10, 50);
        assert!(paginator.jump_to("3"));
        assert_eq!(paginator.current_page(), 3);

        assert!(!paginator.jump_to("abc"));
        assert!(!paginator.jump_to(""));
        assert!(!paginator.jump_to("2.5"));
        assert_eq!(paginator.current_page(), 3);

        assert!(paginator.jump_to("999"));
        assert_eq!(paginator.current_page(), 5);
        assert!(paginator.jump_to(" -4 "));
        assert_eq!(paginator.current_page(), 1);
    }

    #[test]
    fn shrinking_list_pulls_current_page_back() {
        let mut paginator = Paginator::with_len(10, 100);
        paginator.go_to_last();
        assert_eq!(paginator.current_page(), 10);
        paginator.set_len(35);
        assert_eq!(paginator.current_page(), 4);
        paginator.set_len(0);
        assert_eq!(paginator.current_page(), 1);
    }

    #[test]
    fn window_at_first_page() {
        assert_eq!(
            at(1, 20).visible_pages(),
            vec![Page(1), Page(2), Page(3), Ellipsis, Page(20)]
        );
    }

    #[test]
    fn window_in_the_middle() {
        assert_eq!(
            at(10, 20).visible_pages(),
            vec![Page(1), Ellipsis, Page(9), Page(10), Page(11), Ellipsis, Page(20)]
        );
    }

    #[test]
    fn window_near_the_edges() {
        assert_eq!(
            at(4, 20).visible_pages(),
            vec![Page(1), Page(3), Page(4), Page(5), Ellipsis, Page(20)]
        );
        assert_eq!(
            at(5, 20).visible_pages(),
            vec![Page(1), Ellipsis, Page(4), Page(5), Page(6), Ellipsis, Page(20)]
        );
        assert_eq!(
            at(17, 20).visible_pages(),
            vec![Page(1), Ellipsis, Page(16), Page(17), Page(18), Page(20)]
        );
        assert_eq!(
            at(20, 20).visible_pages(),
            vec![Page(1), Ellipsis, Page(18), Page(19), Page(20)]
        );
    }

    #[test]
    fn window_for_few_pages() {
        assert_eq!(at(1, 1).visible_pages(), vec![Page(1)]);
        assert_eq!(at(1, 2).visible_pages(), vec![Page(1), Page(2)]);
        assert_eq!(at(2, 3).visible_pages(), vec![Page(1), Page(2), Page(3)]);
    }

    #[test]
    fn window_lists_every_page_up_to_seven() {
        let all = |total: usize| (1..=total).map(Page).collect::<Vec<_>>();
        assert_eq!(at(1, 5).visible_pages(), all(5));
        assert_eq!(at(1, 7).visible_pages(), all(7));
        assert_eq!(at(4, 7).visible_pages(), all(7));
        assert_eq!(at(7, 7).visible_pages(), all(7));
        assert_eq!(
            at(1, 8).visible_pages(),
            vec![Page(1), Page(2), Page(3), Ellipsis, Page(8)]
        );
    }

    #[test]
    fn page_view_wire_form() {
        let paginator = Paginator::with_len(1, 9);
        let view = PageView::build(&[], &paginator);
        let json = serde_json::to_value(&view).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "page": 1,
                "total_pages": 9,
                "items_per_page": 1,
                "window": [{"page": 1}, {"page": 2}, {"page": 3}, "ellipsis", {"page": 9}],
                "rows": [],
            })
        );
    }

    #[test]
    fn rows_carry_global_rank() {
        let stakers: Vec<Staker> = (0..12)
            .map(|i| Staker {
                wallet: format!("wallet-number-{i:02}"),
                staking_power: 100.0 - i as f64,
                amount_staked: 10.0,
                start_timestamp: 1_700_000_000,
                end_timestamp: 1_700_000_000 + 86_400 * 30,
            })
            .collect();
        let mut paginator = Paginator::with_len(5, stakers.len());

        let first = ranked_rows(&stakers, &paginator, 1);
        assert!(first[0].leader);
        assert_eq!(first[0].rank, 1);
        assert_eq!(first[0].duration_days, 30);

        paginator.go_to_last();
        let view = PageView::build(&stakers, &paginator);
        assert_eq!(view.page, 3);
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0].rank, 11);
        assert!(!view.rows[0].leader);
        assert_eq!(view.rows[1].wallet, "wallet-number-11");
    }
}
