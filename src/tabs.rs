//! Dashboard tabs and which of them the current user may see.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
  Clients,
  Monthly,
  Performance,
  Hours,
  ClientDetail,
  Planning,
  Health,
  Campaigns,
  Alerts,
}

impl Tab {
  /// Display order
  pub const ALL: [Tab; 9] = [
    Tab::Clients,
    Tab::Monthly,
    Tab::Performance,
    Tab::Hours,
    Tab::ClientDetail,
    Tab::Planning,
    Tab::Health,
    Tab::Campaigns,
    Tab::Alerts,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      Tab::Clients => "Clients",
      Tab::Monthly => "Monthly",
      Tab::Performance => "Performance",
      Tab::Hours => "Hours",
      Tab::ClientDetail => "Client detail",
      Tab::Planning => "Planning",
      Tab::Health => "Data health",
      Tab::Campaigns => "Campaigns",
      Tab::Alerts => "Alerts",
    }
  }

  /// Command palette name
  pub fn command(&self) -> &'static str {
    match self {
      Tab::Clients => "clients",
      Tab::Monthly => "monthly",
      Tab::Performance => "performance",
      Tab::Hours => "hours",
      Tab::ClientDetail => "client",
      Tab::Planning => "planning",
      Tab::Health => "health",
      Tab::Campaigns => "campaigns",
      Tab::Alerts => "alerts",
    }
  }

  pub fn from_command(name: &str) -> Option<Tab> {
    Tab::ALL.into_iter().find(|t| t.command() == name)
  }

  /// Financial tabs, shown to admins only
  pub fn admin_only(&self) -> bool {
    matches!(self, Tab::Clients | Tab::Monthly | Tab::Performance)
  }

  /// 1-based position, used for the number-key shortcuts
  pub fn number(&self) -> usize {
    Tab::ALL.iter().position(|t| t == self).unwrap_or(0) + 1
  }

  pub fn from_number(n: usize) -> Option<Tab> {
    n.checked_sub(1).and_then(|i| Tab::ALL.get(i).copied())
  }
}

#[derive(Debug, Clone)]
pub struct TabController {
  active: Tab,
  admin_hidden: bool,
}

impl Default for TabController {
  fn default() -> Self {
    Self {
      active: Tab::Clients,
      admin_hidden: false,
    }
  }
}

impl TabController {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn active(&self) -> Tab {
    self.active
  }

  pub fn is_visible(&self, tab: Tab) -> bool {
    !(self.admin_hidden && tab.admin_only())
  }

  pub fn visible(&self) -> Vec<Tab> {
    Tab::ALL
      .into_iter()
      .filter(|t| self.is_visible(*t))
      .collect()
  }

  pub fn first_visible(&self) -> Tab {
    self.visible().first().copied().unwrap_or(Tab::Hours)
  }

  /// Activate `tab`. Returns false when nothing changed: the tab is
  /// already active or hidden from this user.
  pub fn switch_to(&mut self, tab: Tab) -> bool {
    if tab == self.active || !self.is_visible(tab) {
      return false;
    }
    tracing::debug!(from = ?self.active, to = ?tab, "switching tab");
    self.active = tab;
    true
  }

  /// Hide the financial tabs. If one of them is active, move to Hours.
  /// Returns true if the active tab changed.
  pub fn hide_admin_tabs(&mut self) -> bool {
    self.admin_hidden = true;
    if self.active.admin_only() {
      self.active = Tab::Hours;
      return true;
    }
    false
  }

  fn step(&self, forward: bool) -> Tab {
    let visible = self.visible();
    let Some(pos) = visible.iter().position(|t| *t == self.active) else {
      return self.first_visible();
    };
    let len = visible.len();
    let next = if forward {
      (pos + 1) % len
    } else {
      (pos + len - 1) % len
    };
    visible[next]
  }

  pub fn next(&self) -> Tab {
    self.step(true)
  }

  pub fn previous(&self) -> Tab {
    self.step(false)
  }
}
