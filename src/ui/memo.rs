//! Memoized chart preparation.
//!
//! Views redraw on every tick. Turning payloads into bar data is skipped
//! when the slot already holds a preparation for the same input.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Where a chart is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartSlot {
  ClientRevenue,
  MonthlyProfit,
  PerformanceHours,
  HoursShare,
  ClientTimeline,
  PlanningBudget,
  HealthLag,
  AdSpend,
}

/// Digest of everything a chart is drawn from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderKey(String);

impl RenderKey {
  /// Hash the full serialized input, ids and plotted values alike, so two
  /// payloads only share a key when they would draw the same chart.
  pub fn of<T: Serialize + ?Sized>(input: &T) -> Self {
    let mut hasher = Sha256::new();
    match serde_json::to_vec(input) {
      Ok(bytes) => hasher.update(&bytes),
      // Unserializable input never matches a previous key
      Err(e) => hasher.update(format!("unserializable:{}", e).as_bytes()),
    }
    Self(hex::encode(hasher.finalize()))
  }
}

/// Bars ready to hand to the chart widget
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreparedChart {
  pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
  pub label: String,
  pub value: u64,
  /// Text shown on top of the bar
  pub text: String,
  pub color: Option<String>,
}

impl PreparedChart {
  pub fn max(&self) -> u64 {
    self.bars.iter().map(|b| b.value).max().unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.bars.is_empty()
  }
}

#[derive(Debug, Default)]
pub struct ChartMemo {
  slots: HashMap<ChartSlot, (RenderKey, PreparedChart)>,
  builds: usize,
}

impl ChartMemo {
  pub fn new() -> Self {
    Self::default()
  }

  /// Prepared chart for `slot`, rebuilt only when `key` differs from the
  /// last preparation.
  pub fn prepare<F>(&mut self, slot: ChartSlot, key: RenderKey, build: F) -> &PreparedChart
  where
    F: FnOnce() -> PreparedChart,
  {
    let stale = self
      .slots
      .get(&slot)
      .map(|(previous, _)| *previous != key)
      .unwrap_or(true);
    if stale {
      self.builds += 1;
      self.slots.insert(slot, (key, build()));
    }
    &self.slots[&slot].1
  }

  /// Forget every preparation. Called on tab switches and filter changes.
  pub fn clear(&mut self) {
    self.slots.clear();
  }

  /// Number of times a chart was actually built
  pub fn builds(&self) -> usize {
    self.builds
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Serialize)]
  struct Point {
    id: &'static str,
    value: f64,
  }

  fn chart(n: u64) -> PreparedChart {
    PreparedChart {
      bars: vec![Bar {
        label: "a".into(),
        value: n,
        text: n.to_string(),
        color: None,
      }],
    }
  }

  #[test]
  fn test_same_key_reuses_preparation() {
    let mut memo = ChartMemo::new();
    let data = vec![Point { id: "a", value: 1.0 }];

    memo.prepare(ChartSlot::ClientRevenue, RenderKey::of(&data), || chart(1));
    let prepared = memo.prepare(ChartSlot::ClientRevenue, RenderKey::of(&data), || chart(2));
    assert_eq!(prepared.bars[0].value, 1);
    assert_eq!(memo.builds(), 1);
  }

  #[test]
  fn test_changed_values_rebuild() {
    // Same ids and count but different values must not collide
    let before = vec![Point { id: "a", value: 1.0 }];
    let after = vec![Point { id: "a", value: 2.0 }];
    assert_ne!(RenderKey::of(&before), RenderKey::of(&after));

    let mut memo = ChartMemo::new();
    memo.prepare(ChartSlot::MonthlyProfit, RenderKey::of(&before), || chart(1));
    let prepared = memo.prepare(ChartSlot::MonthlyProfit, RenderKey::of(&after), || chart(2));
    assert_eq!(prepared.bars[0].value, 2);
    assert_eq!(memo.builds(), 2);
  }

  #[test]
  fn test_slots_are_independent_and_clear_resets() {
    let mut memo = ChartMemo::new();
    let key = RenderKey::of("x");
    memo.prepare(ChartSlot::HoursShare, key.clone(), || chart(1));
    memo.prepare(ChartSlot::PlanningBudget, key.clone(), || chart(2));
    assert_eq!(memo.builds(), 2);

    memo.clear();
    memo.prepare(ChartSlot::HoursShare, key, || chart(3));
    assert_eq!(memo.builds(), 3);
  }

  #[test]
  fn test_max() {
    assert_eq!(PreparedChart::default().max(), 0);
    let mut c = chart(4);
    c.bars.push(Bar {
      label: "b".into(),
      value: 9,
      text: String::new(),
      color: None,
    });
    assert_eq!(c.max(), 9);
  }
}
