/// Ranked Views
///
/// `TrendQuery` is the immutable description of a trending list request.
/// Stores receive the order-relevant part as a `RankedView`; viewer
/// exclusion and pagination are applied on top of the ordered result.
use std::cmp::Ordering;

use crate::db::{ExclusionFilter, TrendStore};
use crate::error::Result;
use crate::models::{AccountId, TrendRecord};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendQuery {
    locale: Option<String>,
    allowed: bool,
    viewer: Option<AccountId>,
    offset: Option<usize>,
    limit: Option<usize>,
}

impl TrendQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefer posts in `locale`, then the platform default locale.
    pub fn in_locale(self, locale: Option<&str>) -> Self {
        Self {
            locale: locale.filter(|l| !l.is_empty()).map(str::to_string),
            ..self
        }
    }

    /// Only records a moderator (or the default policy) has allowed.
    pub fn allowed(self) -> Self {
        Self {
            allowed: true,
            ..self
        }
    }

    /// Drop posts the viewer has blocked, muted or domain-blocked.
    pub fn filtered_for(self, viewer: AccountId) -> Self {
        Self {
            viewer: Some(viewer),
            ..self
        }
    }

    pub fn offset(self, offset: usize) -> Self {
        Self {
            offset: Some(offset),
            ..self
        }
    }

    pub fn limit(self, limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..self
        }
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn is_allowed_only(&self) -> bool {
        self.allowed
    }

    pub fn viewer(&self) -> Option<AccountId> {
        self.viewer
    }

    /// Viewer exclusion runs after the store read, so a page can only be
    /// pushed down to the store when there is no viewer.
    pub fn ranked_view(&self, default_locale: &str) -> RankedView {
        let (offset, limit) = match self.viewer {
            Some(_) => (0, None),
            None => (self.offset.unwrap_or(0), self.limit),
        };

        RankedView {
            allowed_only: self.allowed,
            locale: self.locale.as_ref().map(|locale| LocalePreference {
                locale: locale.clone(),
                default_locale: default_locale.to_string(),
            }),
            offset,
            limit,
        }
    }

    /// Runs the query against `store`, asking `exclusions` about the viewer.
    pub async fn execute(
        &self,
        store: &dyn TrendStore,
        exclusions: &dyn ExclusionFilter,
        default_locale: &str,
    ) -> Result<Vec<TrendRecord>> {
        let mut records = store.ordered(&self.ranked_view(default_locale)).await?;

        let Some(viewer) = self.viewer else {
            return Ok(records);
        };

        let mut accounts: Vec<AccountId> = records.iter().map(|r| r.account_id).collect();
        accounts.sort_unstable();
        accounts.dedup();

        if !accounts.is_empty() {
            let excluded = exclusions.excluded_account_ids(viewer, &accounts).await?;
            records.retain(|r| !excluded.contains(&r.account_id));
        }

        Ok(paginate(records, self.offset.unwrap_or(0), self.limit))
    }
}

pub fn paginate(
    records: Vec<TrendRecord>,
    offset: usize,
    limit: Option<usize>,
) -> Vec<TrendRecord> {
    let iter = records.into_iter().skip(offset);
    match limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}

/// Order-relevant part of a query, handed to the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedView {
    pub allowed_only: bool,
    pub locale: Option<LocalePreference>,
    pub offset: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalePreference {
    pub locale: String,
    pub default_locale: String,
}

impl LocalePreference {
    /// 2 = requested locale, 1 = platform default, 0 = anything else.
    pub fn tier(&self, language: Option<&str>) -> u8 {
        match language {
            Some(lang) if lang == self.locale => 2,
            Some(lang) if lang == self.default_locale => 1,
            _ => 0,
        }
    }
}

/// Score descending, id ascending.
pub fn by_score(a: &TrendRecord, b: &TrendRecord) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id))
}

pub fn sort_records(records: &mut [TrendRecord], locale: Option<&LocalePreference>) {
    match locale {
        Some(pref) => records.sort_by(|a, b| {
            pref.tier(b.language.as_deref())
                .cmp(&pref.tier(a.language.as_deref()))
                .then_with(|| by_score(a, b))
        }),
        None => records.sort_by(by_score),
    }
}

/// Allowed records in rank order; rank `n` is at index `n - 1`.
pub fn allowed_ranking<'a, I>(records: I) -> Vec<TrendRecord>
where
    I: IntoIterator<Item = &'a TrendRecord>,
{
    let mut allowed: Vec<TrendRecord> = records
        .into_iter()
        .filter(|r| r.allowed)
        .cloned()
        .collect();
    allowed.sort_by(by_score);
    allowed
}
