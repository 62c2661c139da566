//! Item Selector
//!
//! Decides which items a session serves next. Three paths, tried in order:
//!
//! 1. **Pool**: sessions without a deck draw from the review pool and top up
//!    from the global path when the pool runs short.
//! 2. **Deck**: deck-bound sessions rank within the deck.
//! 3. **Global**: every item of the user in the session's language pair.
//!
//! The deck and global paths first exclude a look-back window of recently
//! served items. When that leaves fewer than `limit` candidates the query is
//! repeated without it, since repeats are acceptable once a deck is small.
//!
//! Selection never fails for lack of items; it returns what is available.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::SelectorConfig;
use crate::criteria::ordering_for_selection;
use crate::error::Result;
use crate::pool::ReviewPool;
use crate::random::SeedSource;
use crate::session::SessionState;
use crate::store::{ItemRepository, PoolFilter, RankQuery};
use crate::types::{DeckId, Item, ItemId, LanguagePair, UserId};

/// What the selector needs to know about a session
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionContext {
    pub user: UserId,
    /// Bound deck; pool mode when `None`
    pub deck: Option<DeckId>,
    pub size_limit: u32,
    /// Served item ids, most recent last
    pub served: Vec<ItemId>,
}

impl SelectionContext {
    pub fn from_session(session: &SessionState) -> Self {
        Self {
            user: session.owner,
            deck: session.deck,
            size_limit: session.size_limit,
            served: session.items.iter().map(|i| i.item).collect(),
        }
    }

    pub fn uses_pool(&self) -> bool {
        self.deck.is_none()
    }

    /// Position of the next selection within the session
    pub fn selection_index(&self) -> u32 {
        self.served.len() as u32
    }

    fn recent(&self, count: usize) -> &[ItemId] {
        let start = self.served.len().saturating_sub(count);
        &self.served[start..]
    }
}

/// Multi-path item selector
pub struct ItemSelector {
    items: Arc<dyn ItemRepository>,
    pool: Arc<ReviewPool>,
    config: SelectorConfig,
    seeds: Arc<SeedSource>,
}

impl ItemSelector {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        pool: Arc<ReviewPool>,
        config: SelectorConfig,
        seeds: Arc<SeedSource>,
    ) -> Self {
        Self {
            items,
            pool,
            config,
            seeds,
        }
    }

    /// Look-back window for a session of `size_limit` items
    pub fn lookback_window(&self, size_limit: u32) -> usize {
        let scaled = (f64::from(size_limit) * self.config.lookback_ratio).round() as usize;
        scaled.max(self.config.lookback_min).min(self.config.lookback_max)
    }

    /// Up to `limit` items for the session described by `ctx`
    pub async fn select(
        &self,
        ctx: &SelectionContext,
        limit: usize,
        languages: &LanguagePair,
        exclude: &HashSet<ItemId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Item>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        if !ctx.uses_pool() {
            return self
                .ranked_with_lookback(ctx, ctx.deck, limit, languages, exclude, now)
                .await;
        }

        let mut selected = self
            .pool
            .select_next(ctx.user, languages, exclude, limit, now)
            .await?;
        if selected.len() < limit {
            debug!(
                user = %ctx.user,
                from_pool = selected.len(),
                limit,
                "Pool short, topping up from global selection"
            );
            let mut taken = exclude.clone();
            taken.extend(selected.iter().map(|i| i.id));
            let rest = self
                .ranked_with_lookback(ctx, None, limit - selected.len(), languages, &taken, now)
                .await?;
            selected.extend(rest);
        }
        Ok(selected)
    }

    async fn ranked_with_lookback(
        &self,
        ctx: &SelectionContext,
        deck: Option<DeckId>,
        limit: usize,
        languages: &LanguagePair,
        exclude: &HashSet<ItemId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Item>> {
        let lookback = ctx.recent(self.lookback_window(ctx.size_limit));
        let mut narrowed = exclude.clone();
        narrowed.extend(lookback.iter().copied());

        let mut selected = self.ranked(ctx, deck, limit, languages, narrowed, now).await?;
        if selected.len() < limit && !lookback.is_empty() {
            debug!(
                user = %ctx.user,
                found = selected.len(),
                limit,
                "Too few items outside the look-back window, retrying without it"
            );
            selected = self
                .ranked(ctx, deck, limit, languages, exclude.clone(), now)
                .await?;
        }

        if selected.len() < limit {
            let mut taken = exclude.clone();
            taken.extend(selected.iter().map(|i| i.id));
            let extra = self
                .items
                .fetch_random(
                    ctx.user,
                    deck,
                    languages,
                    &taken,
                    limit - selected.len(),
                    self.seeds.next_seed(),
                )
                .await?;
            selected.extend(extra);
        }
        Ok(selected)
    }

    async fn ranked(
        &self,
        ctx: &SelectionContext,
        deck: Option<DeckId>,
        limit: usize,
        languages: &LanguagePair,
        exclude: HashSet<ItemId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Item>> {
        let query = RankQuery {
            user: ctx.user,
            limit,
            exclude,
            criteria: ordering_for_selection(ctx.selection_index(), self.config.exploration_every),
            pool_filter: PoolFilter::Any,
            deck,
            languages: languages.clone(),
            now,
            seed: self.seeds.next_seed(),
        };
        let mut items = self.items.ranked_fetch(&query).await?;
        items.truncate(limit);
        Ok(items)
    }
}
