//! Paged listing of player records

use crate::error::{MatchmakingError, Result};
use crate::types::PlayerRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: usize = 100;

/// Query for a page of players
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedQuery {
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Field to order by, `-` prefix for descending
    #[serde(default)]
    pub order_by: Option<String>,
    /// Substring the player name must contain
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    10
}

impl Default for PagedQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            order_by: None,
            filter: None,
        }
    }
}

/// One page of results with totals for the caller's pager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub data: Vec<T>,
    /// 0-based index of the returned page
    pub page_index: usize,
    pub page_size: usize,
    /// Items matching the filter across all pages
    pub items_count: usize,
    pub pages_count: usize,
}

/// Sortable player fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerOrder {
    ProfileId,
    Name,
    Rating,
    WinRate,
    GamesCount,
    WinsCount,
    Rank,
    Cluster,
}

impl PlayerOrder {
    /// Parse an `order_by` value into a field and a descending flag
    pub fn parse(value: &str) -> Result<(Self, bool)> {
        let (field, descending) = match value.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (value, false),
        };

        let order = match field {
            "profile_id" => PlayerOrder::ProfileId,
            "name" => PlayerOrder::Name,
            "rating" => PlayerOrder::Rating,
            "win_rate" => PlayerOrder::WinRate,
            "games_count" => PlayerOrder::GamesCount,
            "wins_count" => PlayerOrder::WinsCount,
            "rank" => PlayerOrder::Rank,
            "cluster" => PlayerOrder::Cluster,
            other => {
                return Err(MatchmakingError::InvalidQuery {
                    reason: format!("cannot order players by '{}'", other),
                }
                .into())
            }
        };

        Ok((order, descending))
    }

    fn compare(&self, a: &PlayerRecord, b: &PlayerRecord) -> Ordering {
        match self {
            PlayerOrder::ProfileId => a.profile_id.cmp(&b.profile_id),
            PlayerOrder::Name => a.name.cmp(&b.name),
            PlayerOrder::Rating => a.rating.total_cmp(&b.rating),
            PlayerOrder::WinRate => a.win_rate.total_cmp(&b.win_rate),
            PlayerOrder::GamesCount => a.games_count.cmp(&b.games_count),
            PlayerOrder::WinsCount => a.wins_count.cmp(&b.wins_count),
            // Unranked players sort last
            PlayerOrder::Rank => match (a.rank, b.rank) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            PlayerOrder::Cluster => a.cluster.cmp(&b.cluster),
        }
    }
}

impl PagedQuery {
    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(MatchmakingError::InvalidQuery {
                reason: "page numbers start at 1".to_string(),
            }
            .into());
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(MatchmakingError::InvalidQuery {
                reason: format!("page size must be between 1 and {}", MAX_PAGE_SIZE),
            }
            .into());
        }

        Ok(())
    }
}

/// Filter, order and slice an iterator of records according to `query`
///
/// The input is expected in ascending identifier order; the sort is stable so
/// equal keys keep that order.
pub fn paginate<'a, I>(records: I, query: &PagedQuery) -> Result<PagedResult<PlayerRecord>>
where
    I: IntoIterator<Item = &'a PlayerRecord>,
{
    query.validate()?;

    let order = query
        .order_by
        .as_deref()
        .filter(|value| !value.is_empty())
        .map(PlayerOrder::parse)
        .transpose()?;

    let mut matching: Vec<&PlayerRecord> = records
        .into_iter()
        .filter(|record| match query.filter.as_deref() {
            Some(term) if !term.is_empty() => record.name.contains(term),
            _ => true,
        })
        .collect();

    if let Some((order, descending)) = order {
        matching.sort_by(|a, b| {
            let ordering = order.compare(a, b);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    let items_count = matching.len();
    let page_index = query.page - 1;
    let data = matching
        .into_iter()
        .skip(page_index.saturating_mul(query.page_size))
        .take(query.page_size)
        .cloned()
        .collect();

    Ok(PagedResult {
        data,
        page_index,
        page_size: query.page_size,
        items_count,
        pages_count: items_count.div_ceil(query.page_size),
    })
}
