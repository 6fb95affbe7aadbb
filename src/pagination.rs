//! Page-size policy, page fetching and the paginated envelope.
//!
//! A controller decides whether its index is paginated through
//! [`PaginationPolicy`]. When it is, [`paginate`] runs the query through
//! Sea-ORM's [`PaginatorTrait`] and returns a [`Paginated`] value carrying
//! the items, a [`PaginationMeta`] block and navigation [`PaginationLinks`].

use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Select};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ApiError;
use crate::request::ResourceRequest;
use crate::validation::{ParamRule, ParamRules, ValidationError, ValidationErrors};

pub const LIMIT_PARAM: &str = "limit";
pub const PAGE_PARAM: &str = "page";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationPolicyError {
    #[error("default page size must be greater than zero")]
    ZeroDefaultPageSize,
    #[error("max page size {max} is smaller than default page size {default}")]
    MaxBelowDefault { default: u64, max: u64 },
}

/// Per-controller pagination configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationPolicy {
    /// Paginate every index response, even without `limit`/`page`.
    pub always_paginate: bool,
    /// Paginate when the request carries `limit` or `page`.
    pub enable_paginate: bool,
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl PaginationPolicy {
    pub const DEFAULT: Self = Self {
        always_paginate: true,
        enable_paginate: true,
        default_page_size: 20,
        max_page_size: 100,
    };

    /// # Errors
    ///
    /// Fails when `default_page_size` is zero or exceeds `max_page_size`.
    pub const fn new(
        always_paginate: bool,
        enable_paginate: bool,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Result<Self, PaginationPolicyError> {
        if default_page_size == 0 {
            return Err(PaginationPolicyError::ZeroDefaultPageSize);
        }
        if max_page_size < default_page_size {
            return Err(PaginationPolicyError::MaxBelowDefault {
                default: default_page_size,
                max: max_page_size,
            });
        }
        Ok(Self {
            always_paginate,
            enable_paginate,
            default_page_size,
            max_page_size,
        })
    }

    /// Opt-in pagination: only when the request asks for it.
    #[must_use]
    pub const fn on_request() -> Self {
        Self {
            always_paginate: false,
            ..Self::DEFAULT
        }
    }

    /// Never paginate.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            always_paginate: false,
            enable_paginate: false,
            ..Self::DEFAULT
        }
    }

    #[must_use]
    pub const fn needs_pagination(&self, has_limit: bool, has_page: bool) -> bool {
        self.always_paginate || (self.enable_paginate && (has_limit || has_page))
    }

    #[must_use]
    pub fn needs_pagination_for(&self, request: &ResourceRequest) -> bool {
        self.needs_pagination(request.has_param(LIMIT_PARAM), request.has_param(PAGE_PARAM))
    }

    /// Requested page size clamped to `max_page_size`; `default_page_size`
    /// when none was requested.
    ///
    /// # Errors
    ///
    /// A requested size below 1 is a validation failure on `limit`.
    pub fn effective_page_size(&self, requested: Option<i64>) -> Result<u64, ValidationErrors> {
        match requested {
            None => Ok(self.default_page_size),
            Some(size) => match u64::try_from(size) {
                Ok(size) if size >= 1 => Ok(size.min(self.max_page_size)),
                _ => Err(at_least_one(LIMIT_PARAM).into()),
            },
        }
    }

    /// Query-parameter schema enforced by the index and count pipelines.
    #[must_use]
    pub fn rules() -> ParamRules {
        vec![
            (LIMIT_PARAM, vec![ParamRule::Integer, ParamRule::Min(1)]),
            (PAGE_PARAM, vec![ParamRule::Integer, ParamRule::Min(1)]),
        ]
    }

    /// Reads `page` and `limit` from the request as `(page, per_page)`.
    ///
    /// # Errors
    ///
    /// Non-integer or non-positive values fail validation.
    pub fn page_request(&self, request: &ResourceRequest) -> Result<(u64, u64), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let limit = match integer_param(request, LIMIT_PARAM) {
            Ok(limit) => limit,
            Err(error) => {
                errors.add(error);
                None
            }
        };
        let page = match integer_param(request, PAGE_PARAM) {
            Ok(None) => Some(1),
            Ok(Some(page)) => u64::try_from(page).ok().filter(|p| *p >= 1).or_else(|| {
                errors.add(at_least_one(PAGE_PARAM));
                None
            }),
            Err(error) => {
                errors.add(error);
                None
            }
        };
        let per_page = match self.effective_page_size(limit) {
            Ok(size) => size,
            Err(failed) => {
                failed.errors().iter().cloned().for_each(|e| errors.add(e));
                0
            }
        };

        errors.result()?;
        Ok((page.unwrap_or(1), per_page))
    }
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn at_least_one(field: &str) -> ValidationError {
    ValidationError::new(field, format!("The {field} field must be at least 1."))
}

fn integer_param(request: &ResourceRequest, name: &str) -> Result<Option<i64>, ValidationError> {
    request
        .param(name)
        .map(|raw| {
            raw.parse::<i64>()
                .map_err(|_| ValidationError::new(name, format!("The {name} field must be an integer.")))
        })
        .transpose()
}

/// The `meta` block of a paginated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
    pub path: String,
    /// 1-based index of the first item on the page; `null` when the page is empty
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl PaginationMeta {
    #[must_use]
    pub fn compute(path: impl Into<String>, total: u64, current_page: u64, per_page: u64) -> Self {
        let per_page = per_page.max(1);
        let current_page = current_page.max(1);
        let last_page = total.div_ceil(per_page).max(1);

        let first_index = (current_page - 1).saturating_mul(per_page);
        let (from, to) = if first_index < total {
            (
                Some(first_index + 1),
                Some(first_index.saturating_add(per_page).min(total)),
            )
        } else {
            (None, None)
        };

        Self {
            total,
            per_page,
            current_page,
            last_page,
            path: path.into(),
            from,
            to,
        }
    }
}

/// Navigation links; `next`/`prev` are `null` at the boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationLinks {
    pub first: String,
    pub last: String,
    pub next: Option<String>,
    pub prev: Option<String>,
}

impl PaginationLinks {
    /// Links for `meta`, keeping every query parameter of `request` except
    /// `page`, which is rewritten.
    #[must_use]
    pub fn build(request: &ResourceRequest, meta: &PaginationMeta) -> Self {
        let url_for = |page: u64| {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(request.query_pairs().iter().filter(|(key, _)| key != PAGE_PARAM))
                .append_pair(PAGE_PARAM, &page.to_string())
                .finish();
            format!("{}?{query}", meta.path)
        };

        Self {
            first: url_for(1),
            last: url_for(meta.last_page),
            next: (meta.current_page < meta.last_page).then(|| url_for(meta.current_page + 1)),
            prev: (meta.current_page > 1).then(|| url_for(meta.current_page - 1)),
        }
    }
}

/// One page of items with its navigation data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub links: PaginationLinks,
    pub meta: PaginationMeta,
}

impl<T> Paginated<T> {
    /// Transforms the items, keeping links and meta.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            links: self.links,
            meta: self.meta,
        }
    }
}

/// Whether page `page` has a first row among `total` rows.
///
/// Sea-ORM multiplies the page number by the page size unchecked, so pages
/// starting past the end are never fetched.
fn starts_within(page: u64, per_page: u64, total: u64) -> bool {
    page.checked_sub(1)
        .and_then(|previous| previous.checked_mul(per_page))
        .is_some_and(|offset| offset < total)
}

/// Fetches the requested page of `query`.
///
/// # Errors
///
/// `ValidationFailed` for a bad `limit`/`page`, `Database` when the query fails.
pub async fn paginate<E>(
    db: &DatabaseConnection,
    query: Select<E>,
    request: &ResourceRequest,
    policy: &PaginationPolicy,
) -> Result<Paginated<E::Model>, ApiError>
where
    E: EntityTrait,
    E::Model: Sync,
{
    let (page, per_page) = policy.page_request(request)?;

    let paginator = query.paginate(db, per_page);
    let total = paginator.num_items().await?;
    let data = if starts_within(page, per_page, total) {
        paginator.fetch_page(page - 1).await?
    } else {
        Vec::new()
    };

    let meta = PaginationMeta::compute(request.url(), total, page, per_page);
    let links = PaginationLinks::build(request, &meta);
    tracing::debug!(total, page, per_page, "fetched page");

    Ok(Paginated { data, links, meta })
}
