pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{banner, error, header, info, report, section, stats, success, warn};
pub use progress::Spinner;
pub use table::{TableBuilder, rejected_table, stats_table};
pub use theme::{theme, Theme};
