use serde::Deserialize;

pub const DEFAULT_PAGE_NUMBER: u64 = 1;
// A limit of 0 asks the store for every remaining record.
pub const DEFAULT_PAGE_LIMIT: u64 = 0;

/// Raw `page` and `limit` query parameters, kept as text so that junk input
/// falls back to the defaults instead of rejecting the request.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PaginationParams {
    pub fn new<P, L>(page: P, limit: L) -> Self
    where
        P: ToString,
        L: ToString,
    {
        PaginationParams {
            page: Some(page.to_string()),
            limit: Some(limit.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub skip: u64,
    pub limit: u64,
}

pub fn get_pagination(params: &PaginationParams) -> Pagination {
    let page = coerce(params.page.as_deref())
        .filter(|page| *page > 0)
        .unwrap_or(DEFAULT_PAGE_NUMBER);
    let limit = coerce(params.limit.as_deref()).unwrap_or(DEFAULT_PAGE_LIMIT);

    Pagination {
        skip: (page - 1).saturating_mul(limit),
        limit,
    }
}

fn coerce(value: Option<&str>) -> Option<u64> {
    value?.trim().parse::<i64>().ok().map(i64::unsigned_abs)
}
