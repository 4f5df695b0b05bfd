pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::{draw_header, draw_tab_bar, extract_host, HeaderInfo};
pub use utils::{
  badge_color, budget_color, change_color, format_change, format_gbp, format_hours, series_color,
  source_status_color, truncate,
};
