use super::ids::UserId;
use super::shipment::Shipment;
use super::status::ShipmentStatus;
use serde::{Deserialize, Serialize};

pub const MAX_PAGE_SIZE: u32 = 100;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Clamps out-of-range values instead of rejecting them.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn skip(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Cuts one page out of an already filtered and sorted result set.
    pub fn paginate(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let total_pages = total.div_ceil(request.limit as usize) as u32;
        let items = all
            .into_iter()
            .skip(request.skip())
            .take(request.limit as usize)
            .collect();
        Self {
            items,
            total,
            page: request.page,
            total_pages,
        }
    }
}

/// Equality and substring filters over shipments. Results are ordered
/// newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipmentQuery {
    pub owner: Option<UserId>,
    pub status: Option<ShipmentStatus>,
    /// Case-insensitive substring of the tracking number.
    pub tracking_number_contains: Option<String>,
    pub page: PageRequest,
}

impl ShipmentQuery {
    pub fn matches(&self, shipment: &Shipment) -> bool {
        if let Some(owner) = self.owner
            && shipment.owner() != owner
        {
            return false;
        }
        if let Some(status) = self.status
            && shipment.status() != status
        {
            return false;
        }
        if let Some(needle) = &self.tracking_number_contains {
            let haystack = shipment.tracking_number().as_str().to_ascii_lowercase();
            return haystack.contains(&needle.to_ascii_lowercase());
        }
        true
    }

    /// Filters, sorts newest first and paginates an unordered collection.
    pub fn apply<I>(&self, shipments: I) -> Page<Shipment>
    where
        I: IntoIterator<Item = Shipment>,
    {
        let mut matched: Vec<Shipment> = shipments.into_iter().filter(|s| self.matches(s)).collect();
        matched.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.tracking_number().cmp(b.tracking_number()))
        });
        Page::paginate(matched, self.page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shipment::fixtures;

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(0, 0), PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::new(3, 500).limit, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(3, 10).skip(), 20);
    }

    #[test]
    fn test_paginate() {
        let page = Page::paginate((1..=25).collect::<Vec<_>>(), PageRequest::new(3, 10));
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);

        let empty = Page::paginate(Vec::<u8>::new(), PageRequest::default());
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_query_filters() {
        let owner = UserId::new();
        let shipment = fixtures::shipment(owner);

        let mut query = ShipmentQuery {
            owner: Some(owner),
            ..Default::default()
        };
        assert!(query.matches(&shipment));

        query.status = Some(ShipmentStatus::Delivered);
        assert!(!query.matches(&shipment));

        let search = ShipmentQuery {
            tracking_number_contains: Some("ehe-2025".to_string()),
            ..Default::default()
        };
        assert!(search.matches(&shipment));

        let other = ShipmentQuery {
            owner: Some(UserId::new()),
            ..Default::default()
        };
        assert!(!other.matches(&shipment));
    }
}
