//! [`ThemeIndex`]: theme tag → puzzles, built once per snapshot load.
//!
//! Only the grouping is precomputed. Rating and popularity bounds differ per
//! query, so they are applied while walking a theme's posting list.

use std::collections::{HashMap, HashSet};

use tactica_core::puzzle::{ThemeCount, split_field};

use crate::{CatalogStore, Result};

// ─── Bounds ──────────────────────────────────────────────────────────────────

/// Inclusive rating range plus a popularity floor. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
  pub min_rating:     Option<i64>,
  pub max_rating:     Option<i64>,
  pub min_popularity: Option<i64>,
}

impl Bounds {
  pub fn contains(&self, rating: i64, popularity: i64) -> bool {
    self.min_rating.is_none_or(|min| rating >= min)
      && self.max_rating.is_none_or(|max| rating <= max)
      && self.min_popularity.is_none_or(|min| popularity >= min)
  }

  /// `(min_rating, max_rating, min_popularity)` with open ends widened to the
  /// full `i64` range.
  pub(crate) fn sql_params(&self) -> (i64, i64, i64) {
    (
      self.min_rating.unwrap_or(i64::MIN),
      self.max_rating.unwrap_or(i64::MAX),
      self.min_popularity.unwrap_or(i64::MIN),
    )
  }
}

// ─── Index ───────────────────────────────────────────────────────────────────

struct Entry {
  id:         String,
  rating:     i64,
  popularity: i64,
}

/// Read-only after construction.
#[derive(Default)]
pub struct ThemeIndex {
  entries:  Vec<Entry>,
  /// Positions into `entries`, ascending, one per puzzle.
  by_theme: HashMap<String, Vec<u32>>,
}

impl ThemeIndex {
  /// Scan the catalog once and group puzzles by theme.
  pub async fn build(catalog: &CatalogStore) -> Result<Self> {
    let rows = catalog
      .query_all(
        "SELECT id, rating, COALESCE(popularity, 0), COALESCE(themes, '')
         FROM puzzles ORDER BY id",
        vec![],
        |r| {
          Ok((
            r.get::<_, String>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, i64>(2)?,
            r.get::<_, String>(3)?,
          ))
        },
      )
      .await?;

    Ok(Self::from_rows(rows))
  }

  /// `(id, rating, popularity, themes)` rows, themes space-joined.
  pub fn from_rows<I>(rows: I) -> Self
  where
    I: IntoIterator<Item = (String, i64, i64, String)>,
  {
    let mut index = Self::default();

    for (id, rating, popularity, themes) in rows {
      let pos = index.entries.len() as u32;
      index.entries.push(Entry { id, rating, popularity });

      for theme in split_field(&themes) {
        let postings = index.by_theme.entry(theme).or_default();
        // A row listing the same theme twice still counts once.
        if postings.last() != Some(&pos) {
          postings.push(pos);
        }
      }
    }

    index
  }

  /// Number of puzzles indexed.
  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  /// Puzzles carrying `theme` inside `bounds`. Unknown themes yield nothing.
  pub fn lookup(&self, theme: &str, bounds: &Bounds) -> Vec<&str> {
    self
      .by_theme
      .get(theme)
      .into_iter()
      .flatten()
      .map(|&pos| &self.entries[pos as usize])
      .filter(|e| bounds.contains(e.rating, e.popularity))
      .map(|e| e.id.as_str())
      .collect()
  }

  /// Puzzles carrying any of `themes` inside `bounds`, deduplicated and in id
  /// order.
  pub fn union(&self, themes: &[String], bounds: &Bounds) -> Vec<&str> {
    let mut positions: HashSet<u32> = HashSet::new();
    for theme in themes {
      if let Some(postings) = self.by_theme.get(theme.as_str()) {
        positions.extend(postings.iter().copied().filter(|&pos| {
          let e = &self.entries[pos as usize];
          bounds.contains(e.rating, e.popularity)
        }));
      }
    }

    let mut positions: Vec<u32> = positions.into_iter().collect();
    // Entries were inserted in id order, so position order is id order.
    positions.sort_unstable();
    positions
      .into_iter()
      .map(|pos| self.entries[pos as usize].id.as_str())
      .collect()
  }

  /// Every theme with its puzzle count, most common first.
  pub fn themes(&self) -> Vec<ThemeCount> {
    let mut themes: Vec<ThemeCount> = self
      .by_theme
      .iter()
      .map(|(theme, postings)| ThemeCount { theme: theme.clone(), count: postings.len() })
      .collect();
    themes.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.theme.cmp(&b.theme)));
    themes
  }
}
